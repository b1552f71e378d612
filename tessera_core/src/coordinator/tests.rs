use std::cell::RefCell;
use std::rc::Rc;

use super::{DEFAULT_WIDGET_Z, FrameCoordinator, FrameReport, Routed};
use crate::event::VoidListener;
use crate::gpu::SurfaceSize;
use crate::input::{KeyInput, MouseInput, MouseKind};
use crate::plugin::{PluginContext, PluginRegistry};
use crate::terminal::{FontMetrics, Terminal};
use crate::test_support::{Journal, MockBackend, MockPlugin, MockWidget, ScriptedProcess, Tally};
use crate::vt::WidgetCommand;
use crate::vt::command::encode_base94;
use crate::widget::{Anchor, PixelRect, PositionMode, WidgetError, WidgetId, WidgetParams};

const SURFACE: SurfaceSize = SurfaceSize {
    width: 640,
    height: 480,
};

fn coordinator(backend: &MockBackend) -> FrameCoordinator<MockBackend> {
    coordinator_with_tallies(backend).0
}

/// Coordinator plus the tallies of every widget its `mock` plugin creates.
fn coordinator_with_tallies(
    backend: &MockBackend,
) -> (FrameCoordinator<MockBackend>, Rc<RefCell<Vec<Rc<Tally>>>>) {
    let mut registry = PluginRegistry::new(PluginContext {
        device: Journal::clone(&backend.journal),
        metrics: FontMetrics::default(),
    });
    let plugin = MockPlugin::new("mock");
    let tallies = plugin.tallies.clone();
    registry.register(Box::new(plugin));
    (FrameCoordinator::new(registry), tallies)
}

fn terminal(cols: usize, lines: usize) -> Rc<RefCell<Terminal>> {
    let term = Terminal::new(cols, lines, FontMetrics::new(10.0, 20.0), VoidListener).unwrap();
    Rc::new(RefCell::new(term))
}

fn relative(x: i32, y: i32) -> WidgetParams {
    WidgetParams {
        x,
        y,
        position: PositionMode::Relative,
        ..WidgetParams::default()
    }
}

/// Anchor the widget saw in its last `prepare_frame`.
fn seen_anchor(tally: &Tally) -> Anchor {
    tally.seen.get().map(|ctx| ctx.anchor).unwrap()
}

fn click() -> MouseInput {
    MouseInput::new(MouseKind::Move, 1.0, 1.0)
}

#[test]
fn prepare_precedes_pass_and_render_follows_creation_order() {
    let mut backend = MockBackend::default();
    let mut coord = coordinator(&backend);
    let (a, _) = MockWidget::handle("a");
    let (b, _) = MockWidget::handle("b");
    let (c, _) = MockWidget::handle("c");
    let ida = coord.add_with_z(a, 500);
    let idb = coord.add(b);
    let idc = coord.add_with_z(c, 1);

    let report = coord.frame(&mut backend, SURFACE).unwrap();
    assert_eq!(report.rendered, vec![ida, idb, idc]);
    assert_eq!(
        backend.entries(),
        vec![
            "prepare:a", "prepare:b", "prepare:c", "pass:open", "render:a", "render:b",
            "render:c", "pass:close", "present:1",
        ]
    );

    // Stable across frames.
    backend.clear();
    let again = coord.frame(&mut backend, SURFACE).unwrap();
    assert_eq!(again.rendered, report.rendered);
    assert_eq!(again.frame, 2);
}

#[test]
fn failed_prepare_skips_render_but_keeps_widget() {
    let mut backend = MockBackend::default();
    let mut coord = coordinator(&backend);
    let (a, pa) = MockWidget::handle("a");
    let (b, pb) = MockWidget::handle("b");
    let ida = coord.add(a);
    let idb = coord.add(b);
    pa.fail_prepare.set(true);

    let report = coord.frame(&mut backend, SURFACE).unwrap();
    assert_eq!(report.failed, vec![ida]);
    assert_eq!(report.rendered, vec![idb]);
    assert_eq!(pa.renders.get(), 0);
    assert_eq!(pb.prepares.get(), 1);
    assert_eq!(pa.disposes.get(), 0);
    assert_eq!(coord.widget_ids(), vec![ida, idb]);

    // Recovers next frame.
    pa.fail_prepare.set(false);
    let report = coord.frame(&mut backend, SURFACE).unwrap();
    assert_eq!(report.rendered, vec![ida, idb]);
}

#[test]
fn unavailable_surface_skips_pass() {
    let mut backend = MockBackend::unavailable();
    let mut coord = coordinator(&backend);
    let (a, pa) = MockWidget::handle("a");
    coord.add(a);

    let report = coord.frame(&mut backend, SURFACE).unwrap();
    assert!(report.surface_skipped);
    assert!(report.rendered.is_empty());
    assert_eq!(pa.prepares.get(), 1);
    assert_eq!(pa.renders.get(), 0);
    assert!(!backend.entries().iter().any(|e| e == "pass:open"));
}

#[test]
fn backend_error_is_returned() {
    let mut backend = MockBackend::broken();
    let mut coord = coordinator(&backend);
    assert!(coord.frame(&mut backend, SURFACE).is_err());
}

#[test]
fn paused_widgets_are_skipped() {
    let mut backend = MockBackend::default();
    let mut coord = coordinator(&backend);
    let (a, pa) = MockWidget::handle("a");
    let id = coord.add(a);
    pa.wants_keyboard.set(true);

    assert!(coord.set_running(id, false));
    assert_eq!(coord.is_running(id), Some(false));
    let report = coord.frame(&mut backend, SURFACE).unwrap();
    assert_eq!(report, FrameReport {
        frame: 1,
        ..FrameReport::default()
    });
    assert_eq!(pa.prepares.get(), 0);
    assert_eq!(coord.dispatch_key(&KeyInput::char('x')), Routed::Unhandled);
}

#[test]
fn create_through_registry() {
    let mut backend = MockBackend::default();
    let mut coord = coordinator(&backend);
    let id = coord.create("mock.other", "-x 2", "data").unwrap();
    let handle = coord.get(id).unwrap();
    assert_eq!(handle.borrow().name(), "other");
    assert_eq!(handle.borrow().payload(), "data");
    drop(handle);
    assert_eq!(coord.frame(&mut backend, SURFACE).unwrap().rendered, vec![id]);
}

#[test]
fn unknown_plugin_leaves_widget_set_unchanged() {
    let mut backend = MockBackend::default();
    let mut coord = coordinator(&backend);
    let err = coord.create("missing", "", "").unwrap_err();
    assert!(matches!(err, WidgetError::UnknownPlugin(_)));
    assert!(coord.is_empty());
    assert!(coord.frame(&mut backend, SURFACE).unwrap().rendered.is_empty());
}

#[test]
fn failed_init_never_renders() {
    let mut backend = MockBackend::default();
    let mut coord = coordinator(&backend);
    assert!(matches!(
        coord.create("mock", "", "fail"),
        Err(WidgetError::Init { .. })
    ));
    assert_eq!(coord.len(), 0);
    coord.frame(&mut backend, SURFACE).unwrap();
    assert!(!backend.entries().iter().any(|e| e.starts_with("render:")));
}

#[test]
fn remove_disposes_and_stops_rendering() {
    let mut backend = MockBackend::default();
    let mut coord = coordinator(&backend);
    let (a, pa) = MockWidget::handle("a");
    let id = coord.add(a);

    assert!(coord.remove(id));
    assert!(!coord.remove(id));
    assert_eq!(pa.disposes.get(), 1);
    assert!(pa.dropped.get());
    assert!(coord.frame(&mut backend, SURFACE).unwrap().rendered.is_empty());
}

#[test]
fn outstanding_handle_keeps_removed_widget_alive() {
    let backend = MockBackend::default();
    let mut coord = coordinator(&backend);
    let (a, pa) = MockWidget::handle("a");
    let id = coord.add(a);
    let held = coord.get(id).unwrap();
    coord.remove(id);
    assert!(!pa.dropped.get());
    drop(held);
    assert!(pa.dropped.get());
}

#[test]
fn mouse_goes_to_most_recent_interested_widget() {
    let backend = MockBackend::default();
    let mut coord = coordinator(&backend);
    let (a, pa) = MockWidget::handle("a");
    let (b, pb) = MockWidget::handle("b");
    coord.add(a);
    let idb = coord.add(b);
    pa.wants_mouse.set(true);
    pb.wants_mouse.set(true);

    assert_eq!(coord.dispatch_mouse(&click()), Routed::Widget(idb));
    assert_eq!(pa.mice.get(), 0);
    assert_eq!(pb.mice.get(), 1);
}

#[test]
fn explicit_z_beats_creation_order() {
    let backend = MockBackend::default();
    let mut coord = coordinator(&backend);
    let (a, pa) = MockWidget::handle("a");
    let (b, pb) = MockWidget::handle("b");
    let ida = coord.add_with_z(a, DEFAULT_WIDGET_Z + 1);
    coord.add(b);
    pa.wants_keyboard.set(true);
    pb.wants_keyboard.set(true);

    assert_eq!(coord.dispatch_key(&KeyInput::char('k')), Routed::Widget(ida));
    assert_eq!(pa.keys.get(), 1);
}

#[test]
fn interest_is_reevaluated_per_event() {
    let backend = MockBackend::default();
    let mut coord = coordinator(&backend);
    let (a, pa) = MockWidget::handle("a");
    let (b, pb) = MockWidget::handle("b");
    let ida = coord.add(a);
    let idb = coord.add(b);
    pa.wants_mouse.set(true);
    pb.wants_mouse.set(true);

    assert_eq!(coord.dispatch_mouse(&click()), Routed::Widget(idb));
    pb.wants_mouse.set(false);
    assert_eq!(coord.dispatch_mouse(&click()), Routed::Widget(ida));
    pa.wants_mouse.set(false);
    assert_eq!(coord.dispatch_mouse(&click()), Routed::Unhandled);
}

#[test]
fn unclaimed_keys_fall_back_to_terminal() {
    let backend = MockBackend::default();
    let mut coord = coordinator(&backend);
    assert_eq!(coord.dispatch_key(&KeyInput::char('x')), Routed::Unhandled);

    let term = Terminal::new(10, 2, FontMetrics::default(), VoidListener).unwrap();
    coord.attach_terminal(Rc::new(RefCell::new(term)));
    assert_eq!(coord.dispatch_key(&KeyInput::char('x')), Routed::Terminal);
}

#[test]
fn alternate_screen_widgets_hide_on_main_screen() {
    let mut backend = MockBackend::default();
    let mut coord = coordinator(&backend);
    let term = Rc::new(RefCell::new(
        Terminal::new(10, 2, FontMetrics::default(), VoidListener).unwrap(),
    ));
    coord.attach_terminal(term.clone());

    let (view, _) = MockWidget::handle("view");
    let view_id = coord.add_terminal_view(view);
    let (main, _) = MockWidget::handle("main");
    let main_id = coord.add(main);

    term.borrow_mut().advance(b"\x1b[?1049h");
    let (alt, _) = MockWidget::handle("alt");
    let alt_id = coord.add(alt);

    let report = coord.frame(&mut backend, SURFACE).unwrap();
    assert_eq!(report.rendered, vec![view_id, alt_id]);

    term.borrow_mut().advance(b"\x1b[?1049l");
    let report = coord.frame(&mut backend, SURFACE).unwrap();
    assert_eq!(report.rendered, vec![view_id, main_id]);
}

#[test]
fn drop_disposes_widgets_and_plugins() {
    let backend = MockBackend::default();
    let mut registry = PluginRegistry::new(PluginContext {
        device: Journal::clone(&backend.journal),
        metrics: FontMetrics::default(),
    });
    let plugin = MockPlugin::new("mock");
    let plugin_disposes = plugin.disposes.clone();
    registry.register(Box::new(plugin));
    let mut coord = FrameCoordinator::new(registry);
    let (a, pa) = MockWidget::handle("a");
    coord.add(a);

    drop(coord);
    assert_eq!(pa.disposes.get(), 1);
    assert!(pa.dropped.get());
    assert_eq!(plugin_disposes.get(), 1);
}

#[test]
fn frame_context_reaches_widgets() {
    use crate::gpu::GpuBackend;
    use crate::widget::{FrameContext, Widget, build};

    struct Capture(Rc<RefCell<Option<FrameContext>>>);

    impl Widget<MockBackend> for Capture {
        fn name(&self) -> &str {
            "capture"
        }
        fn payload(&self) -> &str {
            ""
        }
        fn init(&mut self) -> Result<(), WidgetError> {
            Ok(())
        }
        fn render(&mut self, _pass: &mut <MockBackend as GpuBackend>::Pass<'_>, ctx: &FrameContext) {
            *self.0.borrow_mut() = Some(*ctx);
        }
        fn dispose(&mut self) {}
    }

    let mut backend = MockBackend::default();
    let mut coord = coordinator(&backend);
    let seen = Rc::new(RefCell::new(None));
    let term = Terminal::new(10, 2, FontMetrics::new(7.0, 14.0), VoidListener).unwrap();
    let term = Rc::new(RefCell::new(term));
    term.borrow_mut().advance(b"abc");
    coord.attach_terminal(term);
    coord.add(build(Capture(seen.clone())).unwrap());

    coord.frame(&mut backend, SURFACE).unwrap();
    let ctx = seen.borrow().unwrap();
    assert_eq!(ctx.surface, SURFACE);
    assert_eq!(ctx.metrics, FontMetrics::new(7.0, 14.0));
    assert_eq!(ctx.anchor, Anchor::new(0, 3));
    assert_eq!(ctx.frame, 1);
}

#[test]
fn relative_widget_stays_put_while_output_continues() {
    let mut backend = MockBackend::default();
    let mut coord = coordinator(&backend);
    let term = terminal(20, 5);
    coord.attach_terminal(term.clone());

    term.borrow_mut().advance(b"$ ");
    let (widget, tally) = MockWidget::handle("inline");
    coord.add(widget);
    coord.frame(&mut backend, SURFACE).unwrap();
    let before = tally.seen.get().unwrap().place(&relative(0, 1), (4, 2));
    assert_eq!(seen_anchor(&tally), Anchor::new(0, 2));

    term.borrow_mut().advance(b"ls -la\r\nfoo\r\n");
    coord.frame(&mut backend, SURFACE).unwrap();
    let after = tally.seen.get().unwrap().place(&relative(0, 1), (4, 2));
    assert_eq!(after, before);
    assert_eq!(after, PixelRect::new(20.0, 20.0, 40.0, 40.0));
}

#[test]
fn relative_widget_moves_up_with_scrolled_output() {
    let mut backend = MockBackend::default();
    let mut coord = coordinator(&backend);
    let term = terminal(20, 2);
    coord.attach_terminal(term.clone());

    term.borrow_mut().advance(b"$ ");
    let (widget, tally) = MockWidget::handle("inline");
    coord.add(widget);

    // Two lines of output on a two-line grid push the prompt up one line.
    term.borrow_mut().advance(b"ls -la\r\nfoo\r\n");
    coord.frame(&mut backend, SURFACE).unwrap();
    assert_eq!(seen_anchor(&tally), Anchor::new(-1, 2));
    let rect = tally.seen.get().unwrap().place(&relative(0, 1), (4, 1));
    assert_eq!((rect.x, rect.y), (20.0, 0.0));
}

#[test]
fn widgets_added_without_a_terminal_anchor_at_the_origin() {
    let mut backend = MockBackend::default();
    let mut coord = coordinator(&backend);
    let (widget, tally) = MockWidget::handle("loose");
    coord.add(widget);
    let term = terminal(20, 5);
    term.borrow_mut().advance(b"abc");
    coord.attach_terminal(term);

    coord.frame(&mut backend, SURFACE).unwrap();
    assert_eq!(seen_anchor(&tally), Anchor::default());
}

#[test]
fn wheel_outside_a_widget_reaches_the_terminal() {
    let backend = MockBackend::default();
    let mut coord = coordinator(&backend);
    let script = ScriptedProcess::default();
    let mut term = Terminal::new(10, 4, FontMetrics::new(10.0, 20.0), VoidListener)
        .unwrap()
        .with_spawner(script.clone());
    term.start(Some("fake-shell")).unwrap();
    term.advance(b"\x1b[?1049h");
    coord.attach_terminal(Rc::new(RefCell::new(term)));

    let (widget, tally) = MockWidget::handle("chart");
    let id = coord.add(widget);
    tally.wants_mouse.set(true);
    tally.area.set(Some(PixelRect::new(0.0, 0.0, 50.0, 40.0)));
    script.clear_written();

    let wheel = |x, y| MouseInput::new(MouseKind::Scroll { dx: 0.0, dy: 1.0 }, x, y);
    assert_eq!(coord.dispatch_mouse(&wheel(300.0, 300.0)), Routed::Terminal);
    assert_eq!(script.written(), b"\x1b[A");
    assert_eq!(tally.mice.get(), 0);

    assert_eq!(coord.dispatch_mouse(&wheel(10.0, 10.0)), Routed::Widget(id));
    assert_eq!(tally.mice.get(), 1);
    assert_eq!(script.written(), b"\x1b[A");
}

/// `ESC ] 99999 ; body ST`
fn widget_osc(body: &str) -> Vec<u8> {
    format!("\x1b]99999;{body}\x1b\\").into_bytes()
}

#[test]
fn terminal_output_creates_widgets_anchored_where_written() {
    let mut backend = MockBackend::default();
    let (mut coord, tallies) = coordinator_with_tallies(&backend);
    let term = terminal(20, 5);
    coord.attach_terminal(term.clone());

    let payload = encode_base94(b"hello");
    let mut bytes = b"$ ".to_vec();
    bytes.extend(widget_osc(&format!("mock.box;R;0;1;3;2;{payload}")));
    bytes.extend_from_slice(b"done\r\n");
    term.borrow_mut().advance(&bytes);

    let report = coord.frame(&mut backend, SURFACE).unwrap();
    let &[id] = report.created.as_slice() else {
        panic!("expected one widget, got {:?}", report.created);
    };
    assert_eq!(report.rendered, vec![id]);
    let handle = coord.get(id).unwrap();
    assert_eq!(handle.borrow().name(), "box");
    assert_eq!(handle.borrow().payload(), "hello");
    drop(handle);

    // Anchored where the sequence ended, not where the cursor went after.
    let tally = tallies.borrow()[0].clone();
    assert_eq!(seen_anchor(&tally), Anchor::new(0, 2));

    // Applied once.
    assert!(coord.frame(&mut backend, SURFACE).unwrap().created.is_empty());
    assert_eq!(coord.len(), 1);
}

#[test]
fn terminal_output_stops_resumes_and_deletes_widgets() {
    let mut backend = MockBackend::default();
    let (mut coord, tallies) = coordinator_with_tallies(&backend);
    let term = terminal(20, 5);
    coord.attach_terminal(term.clone());
    let id = coord.create("mock.box", "", "").unwrap();
    let tally = tallies.borrow()[0].clone();

    term.borrow_mut().advance(&widget_osc(&format!("mock;S;{}", id.0)));
    assert!(coord.frame(&mut backend, SURFACE).unwrap().rendered.is_empty());
    assert_eq!(coord.is_running(id), Some(false));

    term.borrow_mut().advance(&widget_osc(&format!("mock;C;{}", id.0)));
    assert_eq!(coord.frame(&mut backend, SURFACE).unwrap().rendered, vec![id]);

    term.borrow_mut().advance(&widget_osc(&format!("mock;D;{}", id.0)));
    coord.frame(&mut backend, SURFACE).unwrap();
    assert!(coord.is_empty());
    assert_eq!(tally.disposes.get(), 1);
}

#[test]
fn terminal_output_cannot_touch_the_terminal_view_or_unknown_ids() {
    let backend = MockBackend::default();
    let mut coord = coordinator(&backend);
    let (view, tally) = MockWidget::handle("view");
    let view_id = coord.add_terminal_view(view);

    assert!(matches!(
        coord.apply(WidgetCommand::Delete(view_id.0)),
        Err(WidgetError::NoSuchWidget(id)) if id == view_id
    ));
    assert!(matches!(
        coord.apply(WidgetCommand::Stop(99)),
        Err(WidgetError::NoSuchWidget(WidgetId(99)))
    ));
    assert_eq!(coord.is_running(view_id), Some(true));
    assert_eq!(tally.disposes.get(), 0);
}

#[test]
fn bad_widget_output_is_ignored() {
    let mut backend = MockBackend::default();
    let mut coord = coordinator(&backend);
    let term = terminal(20, 5);
    coord.attach_terminal(term.clone());

    let mut bytes = widget_osc("mock.box;A;x;0;1;1;");
    bytes.extend(widget_osc("missing;A;0;0;1;1;"));
    bytes.extend(widget_osc("mock;D;42"));
    bytes.extend_from_slice(b"ok");
    term.borrow_mut().advance(&bytes);

    let report = coord.frame(&mut backend, SURFACE).unwrap();
    assert!(report.created.is_empty());
    assert!(coord.is_empty());
    assert_eq!(term.borrow().grid().row_text(crate::index::Line(0)), "ok");
}
