// SPDX-FileCopyrightText: 2026 Rollbot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Request handlers, one module per command family.
//!
//! Handlers return `Ok(None)` for events that need no reply. Errors are
//! turned into user text by the dispatcher.

mod admin;
mod autocomplete;
mod guild;
mod roll;
mod saved;
mod settings;

use rollbot_core::{EventKind, Response, RollbotError};

use crate::context::{App, Request};

pub use roll::format_roll;

/// Routes one request to its handler.
pub async fn handle(app: &App, req: &Request) -> Result<Option<Response>, RollbotError> {
    match &req.event.kind {
        EventKind::Ready => {
            tracing::info!(shard = %req.shard, "shard ready");
            Ok(None)
        }
        EventKind::GuildCreate { guild } => guild::joined(app, req, guild).await,
        EventKind::GuildDelete { guild, unavailable } => {
            guild::left(app, req, guild, *unavailable).await
        }
        EventKind::Roll { input, label } => roll::slash(app, req, input, label.as_deref()).await,
        EventKind::Message { content } => roll::message(app, req, content).await,
        EventKind::Autocomplete { field, partial } => {
            autocomplete::suggest(app, req, *field, partial).await
        }
        EventKind::SaveExpression {
            expression,
            name,
            label,
        } => saved::save(app, req, expression, name.clone(), label.clone()).await,
        EventKind::UnsaveExpression { id } => saved::unsave(app, req, id).await,
        EventKind::ExportSaved => saved::export(app, req).await,
        EventKind::ImportSaved { data } => saved::import(app, req, data).await,
        EventKind::ClearHistory => settings::clear_history(app, req).await,
        EventKind::ClearSaved => saved::clear(app, req).await,
        EventKind::SetPreference {
            preference,
            enabled,
        } => settings::set_preference(app, req, *preference, *enabled).await,
        EventKind::RestartShard { shard } => admin::restart_shard(app, req, *shard).await,
        EventKind::Stats => admin::stats(app, req).await,
    }
}
