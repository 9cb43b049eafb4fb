//! `accept_all` plugin: force-accepts every live entry.
//!
//! Not builtin; a task opts in with `accept_all: true`. Uses a forced
//! transition, so it overrides rejections earlier filters made in the
//! same phase.

use crate::entry::Entry;
use crate::errors::{HandlerError, RegistryError};
use crate::phase::Phase;
use crate::registry::{
    DEFAULT_PRIORITY, EntryFn, HandlerContext, PluginDescriptor, PluginRegistry,
};

pub fn register(registry: &mut PluginRegistry) -> Result<(), RegistryError> {
    registry.register(
        PluginDescriptor::builder("accept_all")
            .interface("filter")
            .schema(serde_json::json!({"type": "boolean"}))
            .on_entry(
                Phase::Filter,
                DEFAULT_PRIORITY,
                EntryFn(|entry: &mut Entry, ctx: &HandlerContext| {
                    entry
                        .set_state(
                            crate::entry::EntryState::Accepted,
                            &ctx.plugin,
                            Some("accept_all configured"),
                            true,
                        )
                        .map_err(HandlerError::warning)
                }),
            )
            .build(),
    )
}
