//! Controller behavior driven through a recording engine and a manual task
//! queue.

// Test target reuses lib deps, silence noisy lint.
#![allow(unused_crate_dependencies)]

mod common;

use std::cell::{Cell, RefCell};
use std::rc::Rc;
use std::time::Duration;

use common::{Call, MockFactory, Spy, org_chart};
use graph_unfold::visualizer::data::{Edge, GraphData, Node};
use graph_unfold::visualizer::engine::{GraphEvent, NodeClickEvent, RenderEngine, ViewCommand};
use graph_unfold::visualizer::options::{NodeStylePatch, OptionsPatch, ToolbarPatch};
use graph_unfold::visualizer::scheduler::TaskQueue;
use graph_unfold::visualizer::{CLICK_COOLDOWN, GraphVisualizer, Lifecycle};

type Visualizer = GraphVisualizer<MockFactory>;

fn mount(options: Option<OptionsPatch>) -> (Visualizer, Spy, TaskQueue) {
	let spy = Spy::new();
	let queue = TaskQueue::new();
	let vis = GraphVisualizer::new(Some("#graph"), options, MockFactory::new(&spy), queue.clone());
	(vis, spy, queue)
}

fn mounted_with(data: GraphData) -> (Visualizer, Spy, TaskQueue) {
	let (vis, spy, queue) = mount(None);
	vis.set_data(data);
	queue.run_until_idle();
	(vis, spy, queue)
}

fn sorted(mut ids: Vec<String>) -> Vec<String> {
	ids.sort();
	ids
}

#[derive(Default)]
struct Recorded {
	clicks: Vec<String>,
	expansions: Vec<(String, GraphData)>,
	ready: usize,
}

fn recording_options(log: &Rc<RefCell<Recorded>>) -> OptionsPatch {
	let (clicks, expansions, ready) = (log.clone(), log.clone(), log.clone());
	OptionsPatch {
		on_node_click: Some(Rc::new(move |_: &NodeClickEvent, node: &Node| {
			clicks.borrow_mut().clicks.push(node.id.clone());
		})),
		on_node_expand: Some(Rc::new(move |id: &str, children: &GraphData| {
			expansions
				.borrow_mut()
				.expansions
				.push((id.to_string(), children.clone()));
		})),
		on_graph_ready: Some(Rc::new(move |_: &dyn RenderEngine| {
			ready.borrow_mut().ready += 1;
		})),
		..OptionsPatch::default()
	}
}

#[test]
fn missing_container_leaves_visualizer_uninitialized() {
	let spy = Spy::new();
	let queue = TaskQueue::new();
	let vis: Visualizer = GraphVisualizer::new(None, None, MockFactory::new(&spy), queue.clone());

	assert_eq!(vis.lifecycle(), Lifecycle::Uninitialized);
	vis.set_data(org_chart());
	vis.reset_graph();
	vis.dispatch_toolbar("zoom-in");

	assert!(vis.graph().is_none());
	assert!(vis.data().is_none());
	assert_eq!(spy.with(|s| s.created), 0);
	assert_eq!(queue.pending(), 0);
}

#[test]
fn set_data_shows_data_and_renders_on_next_turn() {
	let log = Rc::new(RefCell::new(Recorded::default()));
	let (vis, spy, queue) = mount(Some(recording_options(&log)));
	assert_eq!(vis.lifecycle(), Lifecycle::Ready);

	vis.set_data(GraphData::new(vec![Node::new("A", "")], vec![]));
	assert_eq!(spy.node_ids(), vec!["A"]);
	assert!(spy.edge_pairs().is_empty());
	assert_eq!(spy.count(&Call::Render), 0);
	assert_eq!(log.borrow().ready, 0);

	assert_eq!(queue.run_until_idle(), 1);
	assert_eq!(spy.count(&Call::Render), 1);
	// Auto-fit runs before the first render.
	assert_eq!(spy.count(&Call::FitCenter), 1);
	assert_eq!(log.borrow().ready, 1);
}

#[test]
fn later_set_data_supersedes_pending_render() {
	let log = Rc::new(RefCell::new(Recorded::default()));
	let (vis, spy, queue) = mount(Some(recording_options(&log)));

	vis.set_data(GraphData::new(vec![Node::new("X", "")], vec![]));
	vis.set_data(GraphData::new(vec![Node::new("Y", "")], vec![]));
	queue.run_until_idle();

	assert_eq!(spy.node_ids(), vec!["Y"]);
	assert_eq!(spy.count(&Call::Render), 1);
	assert_eq!(log.borrow().ready, 1);
	assert_eq!(vis.data().unwrap().nodes[0].id, "Y");
}

#[test]
fn render_failure_is_contained() {
	let log = Rc::new(RefCell::new(Recorded::default()));
	let (vis, spy, queue) = mount(Some(recording_options(&log)));
	spy.fail("render");

	vis.set_data(org_chart());
	queue.run_until_idle();

	assert_eq!(log.borrow().ready, 0);
	assert_eq!(vis.lifecycle(), Lifecycle::Ready);
	assert_eq!(spy.node_ids().len(), 3);
}

#[test]
fn clicking_a_node_reveals_its_children() {
	let log = Rc::new(RefCell::new(Recorded::default()));
	let (vis, spy, queue) = mount(Some(recording_options(&log)));
	let children = GraphData::new(
		vec![Node::new("B", "B"), Node::new("C", "C")],
		vec![Edge::new("A", "B"), Edge::new("A", "C")],
	);
	vis.set_data(GraphData::new(
		vec![Node::new("A", "A").with_children(children.clone())],
		vec![],
	));
	queue.run_until_idle();

	spy.click("A");

	assert_eq!(spy.node_ids(), vec!["A", "B", "C"]);
	assert!(spy.node("A").unwrap().is_expanded);
	assert_eq!(
		spy.edge_pairs(),
		vec![
			("A".to_string(), "B".to_string()),
			("A".to_string(), "C".to_string())
		]
	);
	assert_eq!(log.borrow().clicks, vec!["A"]);
	assert_eq!(log.borrow().expansions, vec![("A".to_string(), children)]);
	assert_eq!(spy.count(&Call::StopLayout), 1);
	// The canonical data keeps the caller's records.
	assert!(!vis.data().unwrap().nodes[0].is_expanded);
}

#[test]
fn children_fan_out_below_the_clicked_node() {
	let (_vis, spy, _queue) = mounted_with(org_chart());
	spy.emit(GraphEvent::NodeClick(NodeClickEvent {
		id: "T1".to_string(),
		x: 40.0,
		y: -20.0,
	}));

	assert_eq!(spy.node("M1").unwrap().position(), Some((40.0, 30.0)));
	assert_eq!(spy.node("M2").unwrap().position(), Some((50.0, 40.0)));
}

#[test]
fn expansion_is_idempotent_per_node() {
	let log = Rc::new(RefCell::new(Recorded::default()));
	let (vis, spy, queue) = mount(Some(recording_options(&log)));
	vis.set_data(org_chart());
	queue.run_until_idle();

	spy.click("T1");
	let nodes = spy.node_ids();
	let edges = spy.edge_pairs();
	spy.clear_calls();

	spy.click("T1");
	assert_eq!(spy.node_ids(), nodes);
	assert_eq!(spy.edge_pairs(), edges);
	assert_eq!(spy.count(&Call::SetData), 0);
	assert_eq!(log.borrow().expansions.len(), 1);
	assert_eq!(log.borrow().clicks.len(), 1);
}

#[test]
fn leaves_and_unknown_nodes_do_not_fire_callbacks() {
	let log = Rc::new(RefCell::new(Recorded::default()));
	let (vis, spy, queue) = mount(Some(recording_options(&log)));
	vis.set_data(org_chart());
	queue.run_until_idle();
	spy.clear_calls();

	spy.click("L1");
	spy.click("ghost");

	assert!(log.borrow().clicks.is_empty());
	assert!(log.borrow().expansions.is_empty());
	assert_eq!(spy.count(&Call::SetData), 0);
}

#[test]
fn nested_children_expand_from_revealed_nodes() {
	let grandchildren = GraphData::new(vec![Node::new("G", "G")], vec![Edge::new("B", "G")]);
	let data = GraphData::new(
		vec![Node::new("A", "A").with_children(GraphData::new(
			vec![Node::new("B", "B").with_children(grandchildren)],
			vec![Edge::new("A", "B")],
		))],
		vec![],
	);
	let (_vis, spy, _queue) = mounted_with(data);

	spy.click("A");
	spy.click("B");

	assert_eq!(spy.node_ids(), vec!["A", "B", "G"]);
	assert!(spy.node("B").unwrap().is_expanded);
}

#[test]
fn expansion_never_duplicates_ids_or_pairs() {
	let data = GraphData::new(
		vec![
			Node::new("A", "A").with_children(GraphData::new(
				vec![Node::new("B", "again"), Node::new("C", "C")],
				vec![Edge::new("A", "B"), Edge::new("A", "C"), Edge::new("A", "C")],
			)),
			Node::new("B", "B"),
		],
		vec![Edge::new("A", "B")],
	);
	let (_vis, spy, _queue) = mounted_with(data);

	spy.click("A");

	let ids = spy.node_ids();
	assert_eq!(sorted(ids.clone()), vec!["A", "B", "C"]);
	assert_eq!(spy.node("B").unwrap().label, "B");
	let pairs = spy.edge_pairs();
	let mut unique = pairs.clone();
	unique.sort();
	unique.dedup();
	assert_eq!(pairs.len(), unique.len());
	assert_eq!(pairs.len(), 2);
	for (source, target) in pairs {
		assert!(ids.contains(&source) && ids.contains(&target));
	}
}

#[test]
fn click_suppresses_auto_fit_for_a_cool_down() {
	let (_vis, spy, queue) = mounted_with(org_chart());

	spy.click("T1");
	assert!(spy.emit(GraphEvent::BeforeRender).is_empty());

	queue.advance(CLICK_COOLDOWN);
	assert_eq!(spy.emit(GraphEvent::BeforeRender), vec![ViewCommand::FitCenter]);
}

#[test]
fn auto_fit_can_be_disabled() {
	let (vis, spy, queue) = mount(Some(OptionsPatch {
		auto_fit: Some(false),
		..OptionsPatch::default()
	}));
	vis.set_data(org_chart());
	queue.run_until_idle();
	assert_eq!(spy.count(&Call::FitCenter), 0);
}

#[test]
fn failed_expansion_leaves_visible_graph_untouched() {
	let log = Rc::new(RefCell::new(Recorded::default()));
	let (vis, spy, queue) = mount(Some(recording_options(&log)));
	vis.set_data(org_chart());
	queue.run_until_idle();
	let before = spy.node_ids();

	spy.fail("stop_layout");
	spy.click("T1");

	assert_eq!(spy.node_ids(), before);
	assert!(!spy.node("T1").unwrap().is_expanded);
	assert!(log.borrow().expansions.is_empty());
	// Guard released straight away.
	assert_eq!(spy.emit(GraphEvent::BeforeRender), vec![ViewCommand::FitCenter]);

	spy.heal();
	spy.click("T1");
	assert_eq!(log.borrow().expansions.len(), 1);
}

#[test]
fn disabled_expansion_ignores_clicks() {
	let (vis, spy, queue) = mount(Some(OptionsPatch {
		enable_node_expansion: Some(false),
		..OptionsPatch::default()
	}));
	vis.set_data(org_chart());
	queue.run_until_idle();

	spy.click("T1");
	assert_eq!(spy.node_ids(), vec!["L1", "T1", "T2"]);
}

#[test]
fn reset_restores_the_top_level_graph() {
	let data = org_chart();
	let (vis, spy, _queue) = mounted_with(data.clone());
	spy.click("T1");
	spy.click("T2");
	assert_eq!(spy.node_ids().len(), 6);

	vis.reset_graph();

	assert_eq!(spy.node_ids(), vec!["L1", "T1", "T2"]);
	assert_eq!(
		spy.edge_pairs(),
		vec![
			("L1".to_string(), "T1".to_string()),
			("L1".to_string(), "T2".to_string())
		]
	);
	assert!(spy.with(|s| s.nodes.iter().all(|n| !n.is_expanded)));
	assert_eq!(vis.data(), Some(data));

	// Collapsed nodes expand again after a reset.
	spy.click("T1");
	assert_eq!(spy.node_ids().len(), 5);
}

#[test]
fn reset_clears_markers_supplied_by_the_caller() {
	let mut data = org_chart();
	data.nodes[1].is_expanded = true;
	let (vis, spy, _queue) = mounted_with(data);

	vis.reset_graph();
	assert!(!spy.node("T1").unwrap().is_expanded);
	assert!(vis.data().unwrap().nodes[1].is_expanded);
}

#[test]
fn reset_without_data_is_a_no_op() {
	let (vis, spy, _queue) = mount(None);
	vis.reset_graph();
	assert_eq!(spy.count(&Call::Clear), 0);
}

#[test]
fn update_options_rebuilds_engine_and_reapplies_data() {
	let data = org_chart();
	let (vis, spy, queue) = mounted_with(data.clone());
	spy.click("T1");
	spy.clear_calls();

	vis.update_options(OptionsPatch {
		node_style: Some(NodeStylePatch {
			fill: Some("#000".into()),
			..NodeStylePatch::default()
		}),
		..OptionsPatch::default()
	});

	assert_eq!(spy.with(|s| (s.created, s.destroyed)), (2, 1));
	assert_eq!(spy.node_ids(), vec!["L1", "T1", "T2"]);
	queue.run_until_idle();
	assert_eq!(spy.count(&Call::Render), 1);

	let fill = spy.with(|s| {
		let config = s.last_config.as_ref().unwrap();
		config.node.fill.resolve(&data.nodes[0])
	});
	assert_eq!(fill, "#000");
	assert_eq!(vis.options().unwrap().node_style.label_fill, "#333");

	// Click handling is wired to the new engine.
	spy.click("T1");
	assert_eq!(spy.node_ids().len(), 5);
}

#[test]
fn update_options_merges_onto_current_options() {
	let (vis, _spy, _queue) = mount(Some(OptionsPatch {
		auto_fit: Some(false),
		..OptionsPatch::default()
	}));
	vis.update_options(OptionsPatch {
		toolbar: Some(ToolbarPatch {
			enabled: Some(false),
			..ToolbarPatch::default()
		}),
		..OptionsPatch::default()
	});

	let options = vis.options().unwrap();
	assert!(!options.auto_fit);
	assert!(!options.toolbar.enabled);
}

#[test]
fn failed_construction_is_recoverable() {
	let spy = Spy::new();
	spy.with(|s| s.fail_create = true);
	let queue = TaskQueue::new();
	let vis: Visualizer =
		GraphVisualizer::new(Some("#graph"), None, MockFactory::new(&spy), queue.clone());

	assert_eq!(vis.lifecycle(), Lifecycle::Uninitialized);
	assert!(vis.graph().is_none());
	vis.set_data(org_chart());
	assert!(vis.data().is_none());

	spy.heal();
	vis.update_options(OptionsPatch::default());
	assert_eq!(vis.lifecycle(), Lifecycle::Ready);
	assert!(vis.graph().is_some());
}

#[test]
fn destroy_is_final_and_idempotent() {
	let log = Rc::new(RefCell::new(Recorded::default()));
	let (vis, spy, queue) = mount(Some(recording_options(&log)));
	vis.set_data(org_chart());

	vis.destroy();
	vis.destroy();
	assert_eq!(vis.lifecycle(), Lifecycle::Destroyed);
	assert_eq!(spy.with(|s| s.destroyed), 1);
	assert_eq!(queue.pending(), 0);
	assert_eq!(queue.run_until_idle(), 0);
	assert_eq!(log.borrow().ready, 0);

	spy.clear_calls();
	vis.set_data(org_chart());
	vis.reset_graph();
	vis.dispatch_toolbar("zoom-in");
	vis.update_options(OptionsPatch::default());
	vis.init();
	spy.click("T1");

	assert!(vis.graph().is_none());
	assert!(spy.with(|s| s.calls.is_empty()));
	assert_eq!(spy.with(|s| s.created), 1);
}

#[test]
fn destroy_cancels_click_cool_down() {
	let (vis, spy, queue) = mounted_with(org_chart());
	spy.click("T1");
	assert_eq!(queue.pending(), 1);

	vis.destroy();
	assert_eq!(queue.pending(), 0);
}

#[test]
fn toolbar_zooms_within_bounds() {
	let (_vis, spy, _queue) = mounted_with(org_chart());

	spy.press("zoom-in");
	assert_eq!(spy.with(|s| s.zoom), 1.2);
	spy.press("zoom-out");
	assert!((spy.with(|s| s.zoom) - 1.0).abs() < 1e-9);

	for _ in 0..10 {
		spy.press("zoom-in");
	}
	assert_eq!(spy.with(|s| s.zoom), 3.0);
	for _ in 0..20 {
		spy.press("zoom-out");
	}
	assert_eq!(spy.with(|s| s.zoom), 0.5);
}

#[test]
fn toolbar_fit_reset_and_unknown_items() {
	let (_vis, spy, _queue) = mounted_with(org_chart());
	spy.click("T1");
	spy.clear_calls();

	spy.press("auto-fit");
	assert_eq!(spy.count(&Call::FitCenter), 1);

	spy.press("reset");
	assert_eq!(spy.node_ids(), vec!["L1", "T1", "T2"]);

	spy.clear_calls();
	spy.press("export");
	assert!(spy.with(|s| s.calls.is_empty()));
}

#[test]
fn toolbar_failures_are_swallowed() {
	let (vis, spy, _queue) = mounted_with(org_chart());
	spy.fail("zoom_to");
	vis.dispatch_toolbar("zoom-in");
	assert_eq!(spy.with(|s| s.zoom), 1.0);
	assert_eq!(vis.lifecycle(), Lifecycle::Ready);
}

#[test]
fn toolbar_plugin_follows_options() {
	let (_vis, spy, _queue) = mount(None);
	let toolbar = spy.toolbar().unwrap();
	assert_eq!(toolbar.items, vec!["zoom-in", "zoom-out", "auto-fit", "reset"]);

	let (_vis, spy, _queue) = mount(Some(OptionsPatch {
		toolbar: Some(ToolbarPatch {
			enabled: Some(false),
			..ToolbarPatch::default()
		}),
		..OptionsPatch::default()
	}));
	assert!(spy.toolbar().is_none());
}

#[test]
fn callbacks_may_reenter_the_visualizer() {
	let spy = Spy::new();
	let queue = TaskQueue::new();
	let slot: Rc<RefCell<Option<Rc<Visualizer>>>> = Rc::new(RefCell::new(None));
	let inner = slot.clone();
	let options = OptionsPatch {
		on_node_expand: Some(Rc::new(move |_: &str, _: &GraphData| {
			if let Some(vis) = inner.borrow().as_ref() {
				vis.reset_graph();
			}
		})),
		..OptionsPatch::default()
	};
	let vis = Rc::new(GraphVisualizer::new(
		Some("#graph"),
		Some(options),
		MockFactory::new(&spy),
		queue.clone(),
	));
	*slot.borrow_mut() = Some(vis.clone());
	vis.set_data(org_chart());
	queue.run_until_idle();

	spy.click("T1");
	assert_eq!(spy.node_ids(), vec!["L1", "T1", "T2"]);
	slot.borrow_mut().take();
}

#[test]
fn ready_callback_sees_the_engine() {
	let seen = Rc::new(RefCell::new(Vec::new()));
	let record = seen.clone();
	let (vis, _spy, queue) = mount(Some(OptionsPatch {
		on_graph_ready: Some(Rc::new(move |engine: &dyn RenderEngine| {
			record.borrow_mut().push(engine.nodes().len());
		})),
		..OptionsPatch::default()
	}));
	vis.set_data(org_chart());
	queue.advance(Duration::ZERO);
	assert_eq!(*seen.borrow(), vec![3]);
}

type Slot = Rc<RefCell<Option<Rc<Visualizer>>>>;

/// Mounts a visualizer whose callbacks can reach it through the returned slot.
fn mount_reentrant(options: impl FnOnce(Slot) -> OptionsPatch) -> (Rc<Visualizer>, Spy, TaskQueue, Slot) {
	let spy = Spy::new();
	let queue = TaskQueue::new();
	let slot: Slot = Rc::new(RefCell::new(None));
	let vis = Rc::new(GraphVisualizer::new(
		Some("#graph"),
		Some(options(slot.clone())),
		MockFactory::new(&spy),
		queue.clone(),
	));
	*slot.borrow_mut() = Some(vis.clone());
	(vis, spy, queue, slot)
}

#[test]
fn destroy_from_ready_callback_tears_down_engine() {
	let (vis, spy, queue, slot) = mount_reentrant(|slot| OptionsPatch {
		on_graph_ready: Some(Rc::new(move |_: &dyn RenderEngine| {
			if let Some(vis) = slot.borrow().as_ref() {
				vis.destroy();
			}
		})),
		..OptionsPatch::default()
	});

	vis.set_data(org_chart());
	queue.run_until_idle();

	assert_eq!(vis.lifecycle(), Lifecycle::Destroyed);
	assert_eq!(spy.with(|s| s.destroyed), 1);
	assert!(vis.graph().is_none());
	assert_eq!(queue.pending(), 0);
	slot.borrow_mut().take();
}

#[test]
fn ready_callback_may_update_options_and_reset() {
	let calls = Rc::new(Cell::new(0));
	let seen = calls.clone();
	let (vis, spy, queue, slot) = mount_reentrant(move |slot| OptionsPatch {
		on_graph_ready: Some(Rc::new(move |_: &dyn RenderEngine| {
			seen.set(seen.get() + 1);
			if seen.get() > 1 {
				return;
			}
			if let Some(vis) = slot.borrow().as_ref() {
				vis.reset_graph();
				vis.update_options(OptionsPatch {
					auto_fit: Some(false),
					..OptionsPatch::default()
				});
			}
		})),
		..OptionsPatch::default()
	});

	vis.set_data(org_chart());
	queue.run_until_idle();

	assert!(!vis.options().unwrap().auto_fit);
	assert_eq!(spy.with(|s| (s.created, s.destroyed)), (2, 1));
	assert_eq!(spy.node_ids(), vec!["L1", "T1", "T2"]);
	// The rebuilt engine reported ready as well.
	assert_eq!(calls.get(), 2);
	slot.borrow_mut().take();
}

#[test]
fn init_during_click_cool_down_restores_auto_fit_and_data() {
	let (vis, spy, queue) = mounted_with(org_chart());
	spy.click("T1");
	assert!(spy.emit(GraphEvent::BeforeRender).is_empty());

	vis.init();
	assert_eq!(spy.with(|s| (s.created, s.destroyed)), (2, 1));
	assert_eq!(spy.node_ids(), vec!["L1", "T1", "T2"]);

	queue.advance(Duration::from_millis(200));
	assert_eq!(spy.emit(GraphEvent::BeforeRender), vec![ViewCommand::FitCenter]);
	assert_eq!(vis.data(), Some(org_chart()));
}
