//! Application Root
//!
//! Wires the widget state manager, component registry, render dispatcher and
//! session context together and drives them from a single event loop. All
//! state is owned by the task running [`App::run`]; nothing is shared.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::future::Future;
use tokio::sync::mpsc;

use crate::components::{ComponentRegistry, ComponentSource, FrameMessage, GuestId};
use crate::config::Config;
use crate::render::{ForwardMsg, RenderContext, RenderDispatcher, RenderedNode};
use crate::session::{SessionContext, SessionSummary};
use crate::sync::{BackMsgSink, SyncAction, WidgetStateManager};
use crate::widgets::{Source, WidgetValue};

/// Everything the event loop reacts to
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AppEvent {
    /// Message from the backend
    Forward(ForwardMsg),
    /// Message posted by a component frame
    Frame { guest: GuestId, data: Value },
    /// User interaction with a widget
    Interact { id: String, value: WidgetValue },
    /// Container resized
    Resize { width: u32 },
}

pub struct App<S> {
    widgets: WidgetStateManager<S>,
    components: ComponentRegistry,
    dispatcher: RenderDispatcher,
    session: SessionContext,
}

impl<S: BackMsgSink> App<S> {
    pub fn new(config: &Config, sink: S, frames: mpsc::UnboundedSender<FrameMessage>) -> Self {
        Self {
            widgets: WidgetStateManager::new(sink),
            components: ComponentRegistry::new(config.components.registry_config(), frames),
            dispatcher: RenderDispatcher::new(
                config.layout.container_width,
                config.layout.column_policy(),
            ),
            session: SessionContext::start(),
        }
    }

    /// Process events until the channel closes or `shutdown` resolves
    pub async fn run<F>(mut self, mut events: mpsc::UnboundedReceiver<AppEvent>, shutdown: F) -> SessionSummary
    where
        F: Future<Output = ()>,
    {
        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                _ = &mut shutdown => {
                    tracing::info!("Shutdown requested");
                    break;
                }
                event = events.recv() => match event {
                    Some(event) => self.handle_event(event),
                    None => {
                        tracing::debug!("Event channel closed");
                        break;
                    }
                },
            }
        }

        self.finish()
    }

    pub fn handle_event(&mut self, event: AppEvent) {
        match event {
            AppEvent::Forward(msg) => self.handle_forward_msg(msg),
            AppEvent::Frame { guest, data } => self.handle_frame_event(guest, &data),
            AppEvent::Interact { id, value } => {
                self.interact(id, value);
            }
            AppEvent::Resize { width } => self.dispatcher.set_container_width(width),
        }
    }

    pub fn handle_forward_msg(&mut self, msg: ForwardMsg) {
        let mut ctx = RenderContext {
            widgets: &mut self.widgets,
            components: &mut self.components,
            session: &mut self.session,
        };

        match msg {
            ForwardMsg::ScriptStarted { run_id } => {
                self.dispatcher.on_script_started(run_id, ctx.session);
            }
            ForwardMsg::Delta(instruction) => {
                if let Err(e) = self.dispatcher.apply(instruction, &mut ctx) {
                    tracing::warn!(error = %e, "Ignoring delta");
                }
            }
            ForwardMsg::ScriptFinished { status } => {
                self.dispatcher.on_script_finished(status, &mut ctx);
            }
            ForwardMsg::RegisterComponent { name, path, url } => {
                match ComponentSource::from_parts(path, url) {
                    Ok(source) => ctx.components.register_component(name, source),
                    Err(e) => tracing::warn!(component = %name, error = %e, "Component not registered"),
                }
            }
        }
    }

    /// Route a frame event; a resulting flush marks the tree stale
    pub fn handle_frame_event(&mut self, guest: GuestId, data: &Value) {
        let flushes = self.widgets.flush_count();
        self.components.handle_frame_event(guest, data, &mut self.widgets);
        if self.widgets.flush_count() > flushes {
            self.dispatcher.request_rerun();
        }
    }

    /// Apply a user-originated widget change
    pub fn interact(&mut self, id: impl Into<String>, value: WidgetValue) -> SyncAction {
        let action = match value {
            WidgetValue::Trigger(_) => self.widgets.set_trigger_value(id, Source::ui()),
            value => self.widgets.set_value(id, value, Source::ui()),
        };
        if action == SyncAction::Flushed {
            self.dispatcher.request_rerun();
        }
        action
    }

    pub fn snapshot(&self) -> RenderedNode {
        self.dispatcher.snapshot(&self.components)
    }

    pub fn widgets(&self) -> &WidgetStateManager<S> {
        &self.widgets
    }

    pub fn components(&self) -> &ComponentRegistry {
        &self.components
    }

    pub fn dispatcher(&self) -> &RenderDispatcher {
        &self.dispatcher
    }

    pub fn session(&self) -> &SessionContext {
        &self.session
    }

    pub fn finish(self) -> SessionSummary {
        self.session.end()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::components::{HostMessage, ANY_ORIGIN};
    use crate::render::{Node, RenderInstruction, RunState, ScriptFinishedStatus};
    use crate::sync::{BackMsg, ChannelSink};
    use serde_json::json;

    struct Harness {
        app: App<ChannelSink>,
        back_rx: mpsc::UnboundedReceiver<BackMsg>,
        frame_rx: mpsc::UnboundedReceiver<FrameMessage>,
    }

    fn harness() -> Harness {
        let (back_tx, back_rx) = mpsc::unbounded_channel();
        let (frame_tx, frame_rx) = mpsc::unbounded_channel();
        Harness {
            app: App::new(&Config::default(), ChannelSink::new(back_tx), frame_tx),
            back_rx,
            frame_rx,
        }
    }

    fn component_delta(run_id: &str, index: usize) -> ForwardMsg {
        ForwardMsg::Delta(RenderInstruction {
            run_id: run_id.to_string(),
            path: vec![index],
            node: Node::element(json!({
                "type": "component_instance",
                "id": "cc",
                "component_name": "my_component",
                "json_args": "{\"foo\": 1}"
            })),
        })
    }

    fn guest_message(body: Value) -> Value {
        let mut body = body;
        body["isStreamlitMessage"] = json!(true);
        body
    }

    fn mount_ready_component(h: &mut Harness) -> GuestId {
        h.app.handle_forward_msg(ForwardMsg::ScriptStarted {
            run_id: "r1".to_string(),
        });
        h.app.handle_forward_msg(component_delta("r1", 0));
        let guest = h.app.components().instance_for_widget("cc").unwrap().guest();
        h.app.handle_frame_event(
            guest,
            &guest_message(json!({"type": "streamlit:componentReady", "apiVersion": 1})),
        );
        guest
    }

    #[test]
    fn test_component_handshake_end_to_end() {
        let mut h = harness();
        h.app.handle_forward_msg(ForwardMsg::ScriptStarted {
            run_id: "r1".to_string(),
        });
        h.app.handle_forward_msg(component_delta("r1", 0));
        assert!(h.frame_rx.try_recv().is_err());

        let guest = h.app.components().instance_for_widget("cc").unwrap().guest();
        h.app.handle_frame_event(
            guest,
            &guest_message(json!({"type": "streamlit:componentReady", "apiVersion": 1})),
        );

        let posted = h.frame_rx.try_recv().unwrap();
        assert_eq!(posted.guest, guest);
        assert_eq!(posted.target_origin, ANY_ORIGIN);
        let HostMessage::Render(payload) = posted.message.message;
        assert_eq!(payload.args.get("foo"), Some(&json!(1)));

        h.app.handle_frame_event(
            guest,
            &guest_message(json!({
                "type": "streamlit:setComponentValue",
                "dataType": "json",
                "value": {"a": 1}
            })),
        );

        let BackMsg::RerunScript { widget_states } = h.back_rx.try_recv().unwrap();
        assert_eq!(widget_states.widgets.len(), 1);
        assert_eq!(widget_states.widgets[0].id, "cc");
        assert_eq!(
            widget_states.widgets[0].value,
            WidgetValue::Json("{\"a\":1}".to_string())
        );
        assert_eq!(h.app.dispatcher().run_state(), &RunState::RerunRequested);
    }

    #[test]
    fn test_frame_height_skips_render_pass() {
        let mut h = harness();
        let guest = mount_ready_component(&mut h);
        while h.frame_rx.try_recv().is_ok() {}

        let instance_renders = h.app.components().instance(guest).unwrap().render_count();
        let tree_renders = h.app.dispatcher().render_count();

        h.app.handle_frame_event(
            guest,
            &guest_message(json!({"type": "streamlit:setFrameHeight", "height": 300})),
        );

        let instance = h.app.components().instance(guest).unwrap();
        assert_eq!(instance.frame().height, Some(300.0));
        assert_eq!(instance.render_count(), instance_renders);
        assert_eq!(h.app.dispatcher().render_count(), tree_renders);
        assert!(h.frame_rx.try_recv().is_err());
        assert!(h.back_rx.try_recv().is_err());

        let snapshot = serde_json::to_value(h.app.snapshot()).unwrap();
        assert_eq!(snapshot["children"][0]["height"], 300.0);
    }

    #[test]
    fn test_premature_value_is_dropped() {
        let mut h = harness();
        h.app.handle_forward_msg(component_delta("r1", 0));
        let guest = h.app.components().instance_for_widget("cc").unwrap().guest();

        h.app.handle_frame_event(
            guest,
            &guest_message(json!({"type": "streamlit:setWidgetValue", "value": true})),
        );

        assert!(!h.app.widgets().store().contains("cc"));
        assert!(h.back_rx.try_recv().is_err());
        assert_eq!(h.app.dispatcher().run_state(), &RunState::NotRunning);
    }

    #[test]
    fn test_registered_url_is_used_for_frames() {
        let mut h = harness();
        h.app.handle_forward_msg(ForwardMsg::RegisterComponent {
            name: "my_component".to_string(),
            path: None,
            url: Some("http://localhost:3001".to_string()),
        });
        h.app.handle_forward_msg(component_delta("r1", 0));

        let instance = h.app.components().instance_for_widget("cc").unwrap();
        assert_eq!(instance.frame().src, "http://localhost:3001");
    }

    #[test]
    fn test_invalid_registration_is_ignored() {
        let mut h = harness();
        h.app.handle_forward_msg(ForwardMsg::RegisterComponent {
            name: "broken".to_string(),
            path: Some("./build".into()),
            url: Some("http://localhost:3001".to_string()),
        });
        assert!(h.app.components().component_source("broken").is_none());
    }

    #[test]
    fn test_trigger_interaction_is_one_shot() {
        let mut h = harness();
        let action = h.app.interact("go", WidgetValue::Trigger(true));
        assert_eq!(action, SyncAction::Flushed);

        let BackMsg::RerunScript { widget_states } = h.back_rx.try_recv().unwrap();
        assert_eq!(widget_states.widgets[0].value, WidgetValue::Trigger(true));
        assert!(!h.app.widgets().store().contains("go"));

        h.app.interact("name", WidgetValue::String("ada".to_string()));
        let BackMsg::RerunScript { widget_states } = h.back_rx.try_recv().unwrap();
        assert_eq!(widget_states.widgets.len(), 1);
        assert_eq!(widget_states.widgets[0].id, "name");
    }

    #[test]
    fn test_rerun_cycle_cleans_removed_widgets() {
        let mut h = harness();
        let guest = mount_ready_component(&mut h);
        h.app.handle_forward_msg(ForwardMsg::ScriptFinished {
            status: ScriptFinishedStatus::Success,
        });
        assert_eq!(h.app.components().mounted_count(), 1);

        h.app.handle_forward_msg(ForwardMsg::ScriptStarted {
            run_id: "r2".to_string(),
        });
        h.app.handle_forward_msg(ForwardMsg::ScriptFinished {
            status: ScriptFinishedStatus::Success,
        });

        assert_eq!(h.app.components().mounted_count(), 0);
        assert!(h.app.components().instance(guest).is_none());

        h.app.handle_frame_event(
            guest,
            &guest_message(json!({"type": "streamlit:setWidgetValue", "value": 1})),
        );
        assert!(h.back_rx.try_recv().is_err());
    }

    #[test]
    fn test_event_script_format() {
        let event: AppEvent = serde_json::from_value(json!({
            "interact": {"id": "c", "value": {"bool_value": true}}
        }))
        .unwrap();
        assert_eq!(
            event,
            AppEvent::Interact {
                id: "c".to_string(),
                value: WidgetValue::Bool(true)
            }
        );

        let event: AppEvent =
            serde_json::from_value(json!({"frame": {"guest": 1, "data": {"x": 1}}})).unwrap();
        assert!(matches!(event, AppEvent::Frame { guest: GuestId(1), .. }));
    }

    #[tokio::test]
    async fn test_run_loop_drains_events() {
        let (back_tx, mut back_rx) = mpsc::unbounded_channel();
        let (frame_tx, _frame_rx) = mpsc::unbounded_channel();
        let (event_tx, event_rx) = mpsc::unbounded_channel();

        let app = App::new(&Config::default(), ChannelSink::new(back_tx), frame_tx);
        let handle = tokio::spawn(app.run(event_rx, std::future::pending()));

        event_tx
            .send(AppEvent::Forward(ForwardMsg::ScriptStarted {
                run_id: "r1".to_string(),
            }))
            .unwrap();
        event_tx
            .send(AppEvent::Forward(ForwardMsg::Delta(RenderInstruction {
                run_id: "r1".to_string(),
                path: vec![0],
                node: Node::element(json!({"type": "checkbox", "id": "c"})),
            })))
            .unwrap();
        event_tx
            .send(AppEvent::Interact {
                id: "c".to_string(),
                value: WidgetValue::Bool(true),
            })
            .unwrap();
        drop(event_tx);

        let summary = handle.await.unwrap();
        assert_eq!(summary.usage.deltas_applied, 1);
        assert_eq!(summary.usage.script_runs, 1);
        assert_eq!(summary.usage.elements.get("checkbox"), Some(&1));

        let BackMsg::RerunScript { widget_states } = back_rx.recv().await.unwrap();
        assert_eq!(widget_states.widgets[0].value, WidgetValue::Bool(true));
    }

    #[tokio::test]
    async fn test_run_loop_stops_on_shutdown() {
        let (back_tx, _back_rx) = mpsc::unbounded_channel();
        let (frame_tx, _frame_rx) = mpsc::unbounded_channel();
        let (_event_tx, event_rx) = mpsc::unbounded_channel();

        let app = App::new(&Config::default(), ChannelSink::new(back_tx), frame_tx);
        let summary = app.run(event_rx, async {}).await;
        assert_eq!(summary.usage.deltas_applied, 0);
    }
}
