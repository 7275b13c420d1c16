//! Render Dispatcher
//!
//! Owns the mounted tree. Deltas mount leaves (decoding them, writing widget
//! defaults, rendering custom components) and splice the result in at their
//! path. Script lifecycle messages drive staleness and, when a run
//! completes, pruning of everything that run did not produce.

use serde::Serialize;
use std::collections::HashSet;

use super::element::{ComponentInstanceElement, Element};
use super::error::{parse_json_text, ErrorCard, RenderError, RenderResult};
use super::layout::{distribute_widths, ColumnPolicy};
use super::staleness::{staleness, RunState, Staleness};
use super::tree::{BlockLayout, Node, NodeKind, NodeMetadata, RenderInstruction, ScriptFinishedStatus};
use crate::components::{ComponentRegistry, FrameElement, InstanceView, RenderPayload};
use crate::session::SessionContext;
use crate::sync::{BackMsgSink, WidgetStateManager};
use crate::widgets::Source;

/// Collaborators a render pass writes to
pub struct RenderContext<'a, S> {
    pub widgets: &'a mut WidgetStateManager<S>,
    pub components: &'a mut ComponentRegistry,
    pub session: &'a mut SessionContext,
}

#[derive(Debug, Clone)]
struct MountedNode {
    run_id: String,
    metadata: NodeMetadata,
    content: Mounted,
}

#[derive(Debug, Clone)]
enum Mounted {
    Block {
        layout: BlockLayout,
        children: Vec<MountedNode>,
    },
    Element(Element),
    Error(ErrorCard),
}

impl MountedNode {
    fn empty_root() -> Self {
        Self {
            run_id: String::new(),
            metadata: NodeMetadata::default(),
            content: Mounted::Block {
                layout: BlockLayout::Vertical,
                children: Vec::new(),
            },
        }
    }

    fn visit_elements<'a>(&'a self, f: &mut impl FnMut(&'a Element)) {
        match &self.content {
            Mounted::Block { children, .. } => {
                for child in children {
                    child.visit_elements(f);
                }
            }
            Mounted::Element(element) => f(element),
            Mounted::Error(_) => {}
        }
    }
}

/// A laid-out view of the mounted tree
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RenderedNode {
    pub width: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub height: Option<f64>,
    pub staleness: Staleness,
    #[serde(flatten)]
    pub view: RenderedView,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RenderedView {
    Block {
        layout: BlockLayout,
        children: Vec<RenderedNode>,
    },
    Element {
        element_type: &'static str,
        #[serde(skip_serializing_if = "Option::is_none")]
        widget_id: Option<String>,
    },
    Component {
        widget_id: String,
        component_name: String,
        frame: FrameElement,
    },
    Error(ErrorCard),
}

pub struct RenderDispatcher {
    root: MountedNode,
    run_state: RunState,
    current_run_id: Option<String>,
    container_width: u32,
    policy: ColumnPolicy,
    render_count: u64,
}

impl RenderDispatcher {
    pub fn new(container_width: u32, policy: ColumnPolicy) -> Self {
        Self {
            root: MountedNode::empty_root(),
            run_state: RunState::NotRunning,
            current_run_id: None,
            container_width,
            policy,
            render_count: 0,
        }
    }

    /// Apply one delta
    ///
    /// An empty path replaces the root. Otherwise the parent must be a block
    /// and the last index must address an existing child (replace) or one
    /// past the end (append). Leaf failures become error cards; only a bad
    /// path fails the whole delta.
    pub fn apply<S: BackMsgSink>(
        &mut self,
        instruction: RenderInstruction,
        ctx: &mut RenderContext<'_, S>,
    ) -> RenderResult<()> {
        let RenderInstruction { run_id, path, node } = instruction;

        if let Some((index, parent)) = path.split_last() {
            let len = children_at(&self.root, parent)
                .map(Vec::len)
                .ok_or_else(|| RenderError::InvalidPath(path.clone()))?;
            if *index > len {
                return Err(RenderError::InvalidPath(path));
            }
        }

        let mounted = self.mount(node, &run_id, ctx);

        match path.split_last() {
            None => self.root = mounted,
            Some((index, parent)) => {
                let children = children_at_mut(&mut self.root, parent)
                    .ok_or_else(|| RenderError::InvalidPath(path.clone()))?;
                if *index < children.len() {
                    children[*index] = mounted;
                } else {
                    children.push(mounted);
                }
            }
        }

        ctx.session.usage_mut().deltas_applied += 1;
        self.sweep_components(ctx.components);
        Ok(())
    }

    pub fn on_script_started(&mut self, run_id: impl Into<String>, session: &mut SessionContext) {
        let run_id = run_id.into();
        tracing::debug!(run_id = %run_id, "Script run started");
        session.usage_mut().script_runs += 1;
        self.current_run_id = Some(run_id.clone());
        self.run_state = RunState::Running { run_id };
    }

    /// Mark everything stale until the next run starts
    pub fn request_rerun(&mut self) {
        self.run_state = RunState::RerunRequested;
    }

    pub fn on_script_finished<S: BackMsgSink>(
        &mut self,
        status: ScriptFinishedStatus,
        ctx: &mut RenderContext<'_, S>,
    ) {
        tracing::debug!(?status, "Script run finished");
        match status {
            ScriptFinishedStatus::Success => {
                self.run_state = RunState::NotRunning;
                if let Some(run_id) = self.current_run_id.clone() {
                    self.prune(&run_id);
                }
                ctx.widgets.clean(&self.widget_ids());
                self.sweep_components(ctx.components);
            }
            ScriptFinishedStatus::CompileError => {
                self.run_state = RunState::NotRunning;
            }
            ScriptFinishedStatus::EarlyForRerun => {
                self.run_state = RunState::RerunRequested;
            }
        }
    }

    /// Change the container width; takes effect on the next snapshot
    pub fn set_container_width(&mut self, width: u32) {
        tracing::debug!(width, "Relayout");
        self.container_width = width;
    }

    /// Ids of every widget in the tree
    pub fn widget_ids(&self) -> HashSet<String> {
        let mut ids = HashSet::new();
        self.root.visit_elements(&mut |element| {
            if let Some(id) = element.widget_id() {
                ids.insert(id.to_string());
            }
        });
        ids
    }

    pub fn element_at(&self, path: &[usize]) -> Option<&Element> {
        match &node_at(&self.root, path)?.content {
            Mounted::Element(element) => Some(element),
            _ => None,
        }
    }

    pub fn error_card_at(&self, path: &[usize]) -> Option<&ErrorCard> {
        match &node_at(&self.root, path)?.content {
            Mounted::Error(card) => Some(card),
            _ => None,
        }
    }

    pub fn staleness_at(&self, path: &[usize]) -> Option<Staleness> {
        node_at(&self.root, path).map(|node| staleness(&self.run_state, &node.run_id))
    }

    pub fn run_state(&self) -> &RunState {
        &self.run_state
    }

    /// Leaves mounted so far, error cards included
    pub fn render_count(&self) -> u64 {
        self.render_count
    }

    /// Lay out the tree at the current container width
    pub fn snapshot(&self, components: &ComponentRegistry) -> RenderedNode {
        self.render_node(&self.root, self.container_width, components)
    }

    fn mount<S: BackMsgSink>(
        &mut self,
        node: Node,
        run_id: &str,
        ctx: &mut RenderContext<'_, S>,
    ) -> MountedNode {
        let content = match node.kind {
            NodeKind::Block(block) => Mounted::Block {
                layout: block.layout,
                children: block
                    .children
                    .into_iter()
                    .map(|child| self.mount(child, run_id, ctx))
                    .collect(),
            },
            NodeKind::Element(raw) => {
                self.render_count += 1;
                match mount_element(&raw, ctx) {
                    Ok(element) => Mounted::Element(element),
                    Err(e) => {
                        tracing::warn!(run_id = %run_id, error = %e, "Element replaced by error card");
                        ctx.session.usage_mut().render_errors += 1;
                        Mounted::Error(ErrorCard::from(&e))
                    }
                }
            }
        };

        MountedNode {
            run_id: run_id.to_string(),
            metadata: node.metadata,
            content,
        }
    }

    fn prune(&mut self, run_id: &str) {
        let root = std::mem::replace(&mut self.root, MountedNode::empty_root());
        self.root = prune_node(root, run_id).unwrap_or_else(MountedNode::empty_root);
    }

    /// Unmount component instances whose element left the tree
    fn sweep_components(&self, components: &mut ComponentRegistry) {
        let mut active = HashSet::new();
        self.root.visit_elements(&mut |element| {
            if let Element::ComponentInstance(instance) = element {
                active.insert(instance.id.as_str());
            }
        });

        let gone: Vec<String> = components
            .mounted_widgets()
            .filter(|id| !active.contains(id))
            .map(str::to_string)
            .collect();
        for widget_id in gone {
            components.unmount_widget(&widget_id);
        }
    }

    fn render_node(
        &self,
        node: &MountedNode,
        available: u32,
        components: &ComponentRegistry,
    ) -> RenderedNode {
        let width = node
            .metadata
            .width
            .filter(|w| w.is_finite() && *w >= 0.0)
            .map(|w| (w as u32).min(available))
            .unwrap_or(available);
        let mut height = node.metadata.height;

        let view = match &node.content {
            Mounted::Block { layout, children } => {
                let widths = match layout {
                    BlockLayout::Vertical => vec![width; children.len()],
                    BlockLayout::Horizontal => {
                        let weights: Vec<f64> = children
                            .iter()
                            .map(|child| child.metadata.weight.unwrap_or(1.0))
                            .collect();
                        distribute_widths(&weights, width, &self.policy)
                    }
                };
                RenderedView::Block {
                    layout: *layout,
                    children: children
                        .iter()
                        .zip(widths)
                        .map(|(child, w)| self.render_node(child, w, components))
                        .collect(),
                }
            }
            Mounted::Element(Element::ComponentInstance(instance)) => {
                match components.view(&instance.id) {
                    Some(InstanceView::Frame(frame)) => {
                        height = frame.height.or(height);
                        RenderedView::Component {
                            widget_id: instance.id.clone(),
                            component_name: instance.component_name.clone(),
                            frame,
                        }
                    }
                    Some(InstanceView::Error { message }) => RenderedView::Error(ErrorCard {
                        title: "Component error".to_string(),
                        message,
                    }),
                    None => RenderedView::Error(ErrorCard {
                        title: "Component error".to_string(),
                        message: format!("Component {} is not mounted", instance.component_name),
                    }),
                }
            }
            Mounted::Element(element) => RenderedView::Element {
                element_type: element.type_name(),
                widget_id: element.widget_id().map(str::to_string),
            },
            Mounted::Error(card) => RenderedView::Error(card.clone()),
        };

        RenderedNode {
            width,
            height,
            staleness: staleness(&self.run_state, &node.run_id),
            view,
        }
    }
}

fn mount_element<S: BackMsgSink>(
    raw: &serde_json::Value,
    ctx: &mut RenderContext<'_, S>,
) -> RenderResult<Element> {
    let element = Element::decode(raw)?;

    match &element {
        Element::Json(json) => {
            parse_json_text(&json.body)?;
        }
        Element::ComponentInstance(instance) => render_component(instance, ctx)?,
        _ => {}
    }

    if let (Some(id), Some(default)) = (element.widget_id(), element.default_value()) {
        if !ctx.widgets.store().contains(id) {
            ctx.widgets.set_value(id, default, Source::programmatic());
        }
    }

    ctx.session.usage_mut().record_element(element.type_name());
    Ok(element)
}

fn render_component<S: BackMsgSink>(
    instance: &ComponentInstanceElement,
    ctx: &mut RenderContext<'_, S>,
) -> RenderResult<()> {
    let args = match parse_json_text(&instance.json_args)? {
        serde_json::Value::Object(args) => args,
        other => {
            return Err(RenderError::InvalidElement {
                kind: "component_instance".to_string(),
                message: format!("json_args must be an object, got {}", other),
            });
        }
    };

    let payload = RenderPayload {
        args,
        dfs: instance.special_args.clone(),
        disabled: instance.disabled,
    };
    ctx.components.render(
        &instance.id,
        &instance.component_name,
        instance.url.as_deref(),
        payload,
    );
    ctx.session.usage_mut().record_component(&instance.component_name);
    Ok(())
}

/// Keep nodes from `run_id`, and blocks that still hold any
fn prune_node(node: MountedNode, run_id: &str) -> Option<MountedNode> {
    match node.content {
        Mounted::Block { layout, children } => {
            let children: Vec<MountedNode> = children
                .into_iter()
                .filter_map(|child| prune_node(child, run_id))
                .collect();
            if node.run_id == run_id || !children.is_empty() {
                Some(MountedNode {
                    run_id: node.run_id,
                    metadata: node.metadata,
                    content: Mounted::Block { layout, children },
                })
            } else {
                None
            }
        }
        content => (node.run_id == run_id).then(|| MountedNode {
            run_id: node.run_id,
            metadata: node.metadata,
            content,
        }),
    }
}

fn node_at<'a>(node: &'a MountedNode, path: &[usize]) -> Option<&'a MountedNode> {
    match path.split_first() {
        None => Some(node),
        Some((index, rest)) => match &node.content {
            Mounted::Block { children, .. } => node_at(children.get(*index)?, rest),
            _ => None,
        },
    }
}

fn children_at<'a>(node: &'a MountedNode, path: &[usize]) -> Option<&'a Vec<MountedNode>> {
    match &node_at(node, path)?.content {
        Mounted::Block { children, .. } => Some(children),
        _ => None,
    }
}

fn children_at_mut<'a>(node: &'a mut MountedNode, path: &[usize]) -> Option<&'a mut Vec<MountedNode>> {
    let Mounted::Block { children, .. } = &mut node.content else {
        return None;
    };
    match path.split_first() {
        None => Some(children),
        Some((index, rest)) => children_at_mut(children.get_mut(*index)?, rest),
    }
}
