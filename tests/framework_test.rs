use std::{cell::RefCell, rc::Rc};

use instant::Duration;
use render_sandbox::{
    binding_cache::BindingCache,
    context::{Context, FrameTimer, Framebuffer, informative_title},
    data_structures::model::AlphaMode,
    flow::{FlowStack, GraphicsFlow},
    pipelines::deferred_lighting::{WORKGROUP_SIZE, dispatch_size},
    render::opaque_batches,
    scene::MeshBatch,
};
use winit::keyboard::KeyCode;

#[test]
fn should_create_cache_entries_once() {
    let mut cache: BindingCache<(u64, u64), String> = BindingCache::new();
    let mut created = 0;
    for _ in 0..3 {
        let value = cache.get_or_create((1, 2), || {
            created += 1;
            "bind group".to_string()
        });
        assert_eq!(value, "bind group");
    }
    assert_eq!(created, 1);
    assert_eq!(cache.len(), 1);

    cache.get_or_create((2, 2), || "other".to_string());
    assert_eq!(cache.get(&(2, 2)).map(String::as_str), Some("other"));

    cache.clear();
    assert!(cache.is_empty());
    assert!(cache.get(&(1, 2)).is_none());
}

#[test]
fn should_average_frame_time_over_interval() {
    let mut timer = FrameTimer::new(Duration::from_millis(100));
    assert_eq!(timer.fps(), None);
    for _ in 0..9 {
        timer.tick(Duration::from_millis(10));
    }
    assert_eq!(timer.average_frame_time(), None);
    timer.tick(Duration::from_millis(10));
    assert_eq!(timer.average_frame_time(), Some(Duration::from_millis(10)));
    let fps = timer.fps().unwrap();
    assert!((fps - 100.0).abs() < 1e-6);
}

#[test]
fn should_keep_last_average_until_next_window_completes() {
    let mut timer = FrameTimer::new(Duration::from_millis(100));
    timer.tick(Duration::from_millis(100));
    timer.tick(Duration::from_millis(20));
    assert_eq!(timer.average_frame_time(), Some(Duration::from_millis(100)));
}

#[test]
fn should_format_informative_title() {
    assert_eq!(informative_title("Deferred", "Vulkan", None), "Deferred (Vulkan)");
    assert_eq!(
        informative_title("Deferred", "Vulkan", Some(59.94)),
        "Deferred (Vulkan, 59.9 FPS)"
    );
}

#[test]
fn should_round_dispatch_up_to_whole_workgroups() {
    assert_eq!(WORKGROUP_SIZE, 8);
    assert_eq!(dispatch_size(1024, 1024), (128, 128));
    assert_eq!(dispatch_size(1025, 7), (129, 1));
    assert_eq!(dispatch_size(1, 1), (1, 1));
}

#[test]
fn should_keep_only_non_empty_opaque_batches() {
    let batches = vec![
        MeshBatch { mesh: 0, instances: 0..2, mirrored: false },
        MeshBatch { mesh: 1, instances: 2..3, mirrored: false },
        MeshBatch { mesh: 2, instances: 3..3, mirrored: false },
        MeshBatch { mesh: 3, instances: 3..5, mirrored: false },
        MeshBatch { mesh: 4, instances: 5..6, mirrored: false },
    ];
    let modes = [AlphaMode::Opaque, AlphaMode::Blend, AlphaMode::Opaque, AlphaMode::Mask];
    let kept = opaque_batches(&batches, |mesh| modes.get(mesh).copied());
    assert_eq!(
        kept,
        vec![
            MeshBatch { mesh: 0, instances: 0..2, mirrored: false },
            MeshBatch { mesh: 3, instances: 3..5, mirrored: false },
        ]
    );
}

struct Recorder {
    name: &'static str,
    consumes: bool,
    log: Rc<RefCell<Vec<&'static str>>>,
}

impl GraphicsFlow for Recorder {
    fn render(
        &mut self,
        _ctx: &Context,
        _encoder: &mut wgpu::CommandEncoder,
        _back_buffer: &Framebuffer,
    ) -> anyhow::Result<()> {
        Ok(())
    }

    fn keyboard_update(&mut self, _key: KeyCode, _pressed: bool) -> bool {
        self.log.borrow_mut().push(self.name);
        self.consumes
    }
}

fn recorder(name: &'static str, consumes: bool, log: &Rc<RefCell<Vec<&'static str>>>) -> Box<dyn GraphicsFlow> {
    Box::new(Recorder {
        name,
        consumes,
        log: log.clone(),
    })
}

#[test]
fn should_offer_input_back_to_front() {
    let log = Rc::new(RefCell::new(Vec::new()));
    let mut flows = FlowStack::new();
    flows.add_render_pass_to_back(recorder("scene", false, &log));
    flows.add_render_pass_to_back(recorder("overlay", false, &log));
    flows.add_render_pass_to_front(recorder("background", false, &log));

    let consumed = flows.dispatch(|flow| flow.keyboard_update(KeyCode::KeyW, true));
    assert!(!consumed);
    assert_eq!(*log.borrow(), vec!["overlay", "scene", "background"]);
}

#[test]
fn should_stop_at_first_consumer() {
    let log = Rc::new(RefCell::new(Vec::new()));
    let mut flows = FlowStack::new();
    flows.add_render_pass_to_back(recorder("scene", true, &log));
    flows.add_render_pass_to_back(recorder("gui", true, &log));

    assert!(flows.dispatch(|flow| flow.keyboard_update(KeyCode::KeyW, true)));
    assert_eq!(*log.borrow(), vec!["gui"]);

    assert!(flows.remove_render_pass(1).is_some());
    assert!(flows.remove_render_pass(5).is_none());
    assert_eq!(flows.len(), 1);
    log.borrow_mut().clear();
    assert!(flows.dispatch(|flow| flow.keyboard_update(KeyCode::KeyW, true)));
    assert_eq!(*log.borrow(), vec!["scene"]);
}
