//! Topic subscriptions wiring the pipeline together.

use std::sync::Arc;

use serde_json::json;
use topic_bus::{EngineBuilder, Handler, HandlerContext, Message};
use tracing::debug;

use super::actions::{
    notify_error, EnhanceContent, ErrorNotice, FetchItems, Notify, ResolveChannel,
};
use super::stage::{run_stage, Stage};
use super::topics;
use crate::kernel::ServerDeps;

/// Subscribe every stage and the error notifier.
pub fn register_pipeline(builder: EngineBuilder<ServerDeps>) -> EngineBuilder<ServerDeps> {
    builder
        .subscribe(ResolveChannel::INPUT_TOPIC, stage_handler(ResolveChannel))
        .subscribe(FetchItems::INPUT_TOPIC, stage_handler(FetchItems))
        .subscribe(EnhanceContent::INPUT_TOPIC, stage_handler(EnhanceContent))
        .subscribe(Notify::INPUT_TOPIC, stage_handler(Notify))
        .subscribe_all(&topics::ERROR_TOPICS, handle_stage_error)
}

fn stage_handler<S: Stage>(stage: S) -> impl Handler<ServerDeps> {
    let stage = Arc::new(stage);
    move |message: Message, ctx: HandlerContext<ServerDeps>| {
        let stage = stage.clone();
        async move { run_stage(stage.as_ref(), message, ctx).await }
    }
}

async fn handle_stage_error(message: Message, ctx: HandlerContext<ServerDeps>) -> anyhow::Result<()> {
    match notify_error(&message.payload, ctx.deps().email.as_ref()).await {
        ErrorNotice::Notified(notice) => {
            ctx.publish(topics::ERROR_NOTIFIED, json!(notice));
        }
        ErrorNotice::Dropped(reason) => ctx.dead_letter(message.payload, reason),
        ErrorNotice::Failed(reason) => {
            debug!(topic = %message.topic, reason = %reason, "Failure email not delivered");
        }
    }
    Ok(())
}
