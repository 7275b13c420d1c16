//! Component Registry
//!
//! Owns every mounted custom component and routes frame traffic to it.
//! Guests are addressed by a [`GuestId`] handed out at mount time; the
//! transport layer resolves whatever identifies a frame on its side to that id.

use serde_json::Value;
use std::collections::HashMap;
use std::path::PathBuf;
use tokio::sync::mpsc;

use super::error::ChannelError;
use super::instance::{ComponentInstance, InstanceView};
use super::messages::{
    FrameMessage, GuestId, GuestMessage, HostEnvelope, HostMessage, RenderPayload, ANY_ORIGIN,
};
use crate::sync::{BackMsgSink, WidgetStateManager};

/// Where a registered component's assets come from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ComponentSource {
    /// Build directory served by the backend
    Path(PathBuf),
    /// Externally hosted, typically a development server
    Url(String),
}

impl ComponentSource {
    /// Build a source from a declaration that names a path or a url
    pub fn from_parts(path: Option<PathBuf>, url: Option<String>) -> Result<Self, ChannelError> {
        match (path, url) {
            (Some(path), None) => Ok(ComponentSource::Path(path)),
            (None, Some(url)) => Ok(ComponentSource::Url(url)),
            _ => Err(ChannelError::InvalidComponentSource(
                "either 'path' or 'url' must be set, but not both".to_string(),
            )),
        }
    }
}

/// Configuration for the component registry
#[derive(Debug, Clone)]
pub struct RegistryConfig {
    /// Base URL component assets are served from
    pub base_url: String,
    /// Target origin for outbound messages
    pub target_origin: String,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8501/".to_string(),
            target_origin: ANY_ORIGIN.to_string(),
        }
    }
}

/// Arena of custom component instances indexed by guest id
pub struct ComponentRegistry {
    config: RegistryConfig,
    /// Declared components: name → source
    sources: HashMap<String, ComponentSource>,
    /// Mounted instances: GuestId → instance
    instances: HashMap<GuestId, ComponentInstance>,
    /// Widget id → GuestId, so renders find their instance
    by_widget: HashMap<String, GuestId>,
    outbox: mpsc::UnboundedSender<FrameMessage>,
    next_guest: u64,
}

impl ComponentRegistry {
    pub fn new(config: RegistryConfig, outbox: mpsc::UnboundedSender<FrameMessage>) -> Self {
        Self {
            config,
            sources: HashMap::new(),
            instances: HashMap::new(),
            by_widget: HashMap::new(),
            outbox,
            next_guest: 1,
        }
    }

    /// Declare a component by name; re-registering replaces the source
    pub fn register_component(&mut self, name: impl Into<String>, source: ComponentSource) {
        let name = name.into();
        if let Some(previous) = self.sources.insert(name.clone(), source) {
            tracing::debug!(component = %name, ?previous, "Component re-registered");
        }
    }

    pub fn component_source(&self, name: &str) -> Option<&ComponentSource> {
        self.sources.get(name)
    }

    /// URL of a component's entrypoint
    pub fn get_component_url(&self, component_name: &str, entrypoint: &str) -> String {
        match self.sources.get(component_name) {
            Some(ComponentSource::Url(url)) => url.clone(),
            _ => format!(
                "{}component/{}/{}",
                ensure_trailing_slash(&self.config.base_url),
                component_name,
                entrypoint.trim_start_matches('/')
            ),
        }
    }

    /// Create an instance and start routing its guest's traffic
    pub fn register_listener(
        &mut self,
        widget_id: &str,
        component_name: &str,
        element_url: Option<&str>,
    ) -> GuestId {
        if let Some(existing) = self.by_widget.get(widget_id) {
            return *existing;
        }

        let guest = GuestId(self.next_guest);
        self.next_guest += 1;

        let src = element_url
            .map(str::to_string)
            .unwrap_or_else(|| self.get_component_url(component_name, "index.html"));

        self.instances.insert(
            guest,
            ComponentInstance::new(guest, widget_id, component_name, src),
        );
        self.by_widget.insert(widget_id.to_string(), guest);

        tracing::debug!(guest = %guest, widget_id = %widget_id, component = %component_name, "Component mounted");
        guest
    }

    /// Stop routing a guest's traffic and drop its instance
    pub fn deregister_listener(&mut self, guest: GuestId) -> Option<ComponentInstance> {
        let instance = self.instances.remove(&guest)?;
        self.by_widget.remove(instance.widget_id());
        tracing::debug!(guest = %guest, widget_id = %instance.widget_id(), "Component unmounted");
        Some(instance)
    }

    /// Unmount the instance rendering a widget
    pub fn unmount_widget(&mut self, widget_id: &str) -> Option<ComponentInstance> {
        let guest = *self.by_widget.get(widget_id)?;
        self.deregister_listener(guest)
    }

    /// Mount if needed, then render
    pub fn render(
        &mut self,
        widget_id: &str,
        component_name: &str,
        element_url: Option<&str>,
        payload: RenderPayload,
    ) -> GuestId {
        let guest = self.register_listener(widget_id, component_name, element_url);
        let to_send = self
            .instances
            .get_mut(&guest)
            .and_then(|instance| instance.render(payload));

        if let Some(payload) = to_send {
            if let Err(e) = self.post(guest, payload) {
                tracing::warn!(guest = %guest, error = %e, "Render not delivered");
            }
        }
        guest
    }

    /// Route one inbound frame event
    ///
    /// Events from unknown guests and non-protocol traffic are ignored.
    /// Protocol problems are logged and the message discarded.
    pub fn handle_frame_event<S: BackMsgSink>(
        &mut self,
        guest: GuestId,
        data: &Value,
        widgets: &mut WidgetStateManager<S>,
    ) {
        let Some(instance) = self.instances.get_mut(&guest) else {
            tracing::debug!(guest = %guest, "Frame event for unregistered guest ignored");
            return;
        };

        let message = match GuestMessage::from_event(data) {
            Ok(Some(message)) => message,
            Ok(None) => return,
            Err(e) => {
                tracing::warn!(guest = %guest, error = %e, "Discarding malformed component message");
                return;
            }
        };

        match instance.handle_message(message, widgets) {
            Ok(Some(payload)) => {
                if let Err(e) = self.post(guest, payload) {
                    tracing::warn!(guest = %guest, error = %e, "Render not delivered");
                }
            }
            Ok(None) => {}
            Err(e) if e.is_fatal() => {
                tracing::error!(
                    guest = %guest,
                    component = %instance.component_name(),
                    error = %e,
                    "Component failed"
                );
            }
            Err(e) => {
                tracing::warn!(
                    guest = %guest,
                    component = %instance.component_name(),
                    error = %e,
                    "Discarding component message"
                );
            }
        }
    }

    fn post(&self, guest: GuestId, payload: RenderPayload) -> Result<(), ChannelError> {
        let message = FrameMessage {
            guest,
            target_origin: self.config.target_origin.clone(),
            message: HostEnvelope::new(HostMessage::Render(payload)),
        };
        self.outbox
            .send(message)
            .map_err(|_| ChannelError::ChannelClosed)
    }

    pub fn instance(&self, guest: GuestId) -> Option<&ComponentInstance> {
        self.instances.get(&guest)
    }

    pub fn instance_for_widget(&self, widget_id: &str) -> Option<&ComponentInstance> {
        self.by_widget
            .get(widget_id)
            .and_then(|guest| self.instances.get(guest))
    }

    pub fn view(&self, widget_id: &str) -> Option<InstanceView> {
        self.instance_for_widget(widget_id).map(ComponentInstance::view)
    }

    pub fn mounted_count(&self) -> usize {
        self.instances.len()
    }

    /// Widget ids with a mounted instance
    pub fn mounted_widgets(&self) -> impl Iterator<Item = &str> {
        self.by_widget.keys().map(String::as_str)
    }
}

fn ensure_trailing_slash(url: &str) -> String {
    if url.ends_with('/') {
        url.to_string()
    } else {
        format!("{}/", url)
    }
}
