//! End-to-end scene tests against the recording mock device.

use std::sync::Arc;

use ui_overlay::device::mock::{MockCall, MockDevice};
use ui_overlay::device::{QueueId, RenderDevice, ResourceState};
use ui_overlay::draw::{DrawCommand, DrawData, DrawVert};
use ui_overlay::{Scene, SceneConfig, SceneError, TextureFormat};

const RED: [u8; 4] = [255, 0, 0, 255];
const GREEN: [u8; 4] = [0, 255, 0, 255];
const BLUE: [u8; 4] = [0, 0, 255, 255];
const WHITE: [u8; 4] = [255, 255, 255, 255];

fn checker_pixels() -> Vec<u8> {
    [RED, GREEN, BLUE, WHITE].concat()
}

fn setup(config: &SceneConfig) -> (Arc<MockDevice>, QueueId, Scene) {
    let _ = env_logger::builder().is_test(true).try_init();
    let mock = Arc::new(MockDevice::with_swapchain(2, 128, 128));
    let device: Arc<dyn RenderDevice> = mock.clone();
    let queue = device.create_command_queue().unwrap();
    let scene = Scene::new(device, queue, config).unwrap();
    (mock, queue, scene)
}

fn ui_frame(scene: &Scene) -> DrawData {
    let texture = scene
        .create_texture(&checker_pixels(), 2, 2, 4, TextureFormat::Rgba8Unorm)
        .unwrap();
    let handle = texture.descriptor().unwrap();
    DrawData {
        vertices: vec![
            DrawVert { pos: [0.0, 0.0], uv: [0.0, 0.0], color: 0xFFFF_FFFF },
            DrawVert { pos: [128.0, 0.0], uv: [1.0, 0.0], color: 0xFFFF_FFFF },
            DrawVert { pos: [0.0, 128.0], uv: [0.0, 1.0], color: 0xFFFF_FFFF },
        ],
        indices: vec![0, 1, 2],
        commands: vec![DrawCommand {
            texture: handle,
            clip_rect: [0.0, 0.0, 128.0, 128.0],
            index_count: 3,
            index_offset: 0,
            vertex_offset: 0,
        }],
        display_size: [128.0, 128.0],
    }
}

#[test]
fn uploaded_texture_is_shader_readable_with_its_contents() {
    let (mock, _, scene) = setup(&SceneConfig::default());
    let texture = scene
        .create_texture(&checker_pixels(), 2, 2, 4, TextureFormat::Rgba8Unorm)
        .unwrap();

    assert_eq!(texture.width(), 2);
    assert_eq!(texture.height(), 2);
    assert_eq!(mock.texture_data(texture.resource()).unwrap(), checker_pixels());
    assert_eq!(
        mock.texture_state(texture.resource()),
        Some(ResourceState::ShaderResource)
    );
}

#[test]
fn static_font_texture_keeps_its_binding_across_frames() {
    let (_, _, scene) = setup(&SceneConfig::default());
    let font = scene
        .create_texture(&checker_pixels(), 2, 2, 4, TextureFormat::Rgba8Unorm)
        .unwrap();
    scene.bind_static_texture(&font, 0).unwrap();

    let first = font.descriptor().unwrap();
    scene.new_frame();
    let second = font.descriptor().unwrap();
    assert_eq!(first, second);
}

#[test]
fn render_submits_and_restores_the_back_buffer_state() {
    let (mock, queue, scene) = setup(&SceneConfig::default());
    scene.on_resize(2).unwrap();

    scene.new_frame();
    let draw_data = ui_frame(&scene);
    scene.render(&draw_data, 0).unwrap();

    let log = mock.call_log();
    let submit = log
        .iter()
        .position(|c| matches!(c, MockCall::Submit { queue: q, .. } if *q == queue))
        .unwrap();
    let draw = log
        .iter()
        .position(|c| matches!(c, MockCall::RenderDrawData { commands: 1 }))
        .unwrap();
    assert!(submit < draw, "draw executes when the list is submitted");

    // Both transitions ran and the back buffer ended up presentable again.
    let to_target = log.iter().any(
        |c| matches!(c, MockCall::Transition { to: ResourceState::RenderTarget, .. }),
    );
    assert!(to_target);
    let back_buffer = mock
        .call_log()
        .iter()
        .find_map(|c| match c {
            MockCall::Transition { resource, to: ResourceState::RenderTarget } => Some(*resource),
            _ => None,
        })
        .unwrap();
    assert_eq!(mock.texture_state(back_buffer), Some(ResourceState::Present));
}

#[test]
fn render_without_targets_is_a_silent_no_op() {
    let (mock, _, scene) = setup(&SceneConfig::default());

    scene.new_frame();
    let draw_data = ui_frame(&scene);
    scene.render(&draw_data, 0).unwrap();

    assert!(!mock
        .call_log()
        .iter()
        .any(|c| matches!(c, MockCall::RenderDrawData { .. })));
}

#[test]
fn render_with_empty_draw_data_submits_nothing() {
    let (mock, _, scene) = setup(&SceneConfig::default());
    scene.on_resize(2).unwrap();
    let before = mock.call_log().len();

    scene.render(&DrawData::default(), 0).unwrap();

    assert_eq!(mock.call_log().len(), before);
}

#[test]
fn render_rejects_an_out_of_range_back_buffer() {
    let (_, _, scene) = setup(&SceneConfig::default());
    scene.on_resize(2).unwrap();

    scene.new_frame();
    let draw_data = ui_frame(&scene);
    assert!(matches!(
        scene.render(&draw_data, 5),
        Err(SceneError::InvalidBackBuffer { index: 5, count: 2 })
    ));
}

#[test]
fn resize_cycle_releases_and_reacquires_back_buffers() {
    let (mock, _, scene) = setup(&SceneConfig::default());
    scene.on_resize(2).unwrap();
    assert_eq!(mock.swapchain_ref_count(0), 1);

    scene.on_pre_resize();
    assert_eq!(mock.swapchain_ref_count(0), 0);
    assert_eq!(mock.swapchain_ref_count(1), 0);

    // Rendering between the two resize calls draws nothing.
    scene.new_frame();
    let draw_data = ui_frame(&scene);
    scene.render(&draw_data, 0).unwrap();
    assert!(!mock
        .call_log()
        .iter()
        .any(|c| matches!(c, MockCall::RenderDrawData { .. })));

    scene.on_resize(2).unwrap();
    assert_eq!(mock.swapchain_ref_count(0), 1);
    scene.render(&draw_data, 0).unwrap();
    assert!(mock
        .call_log()
        .iter()
        .any(|c| matches!(c, MockCall::RenderDrawData { .. })));
}

#[test]
fn dynamic_descriptors_reset_each_frame() {
    let config = SceneConfig { static_texture_count: 1, dynamic_texture_capacity: 2 };
    let (_, _, scene) = setup(&config);

    let a = scene
        .create_texture(&checker_pixels(), 2, 2, 4, TextureFormat::Rgba8Unorm)
        .unwrap();
    let b = scene
        .create_texture(&checker_pixels(), 2, 2, 4, TextureFormat::Rgba8Unorm)
        .unwrap();
    let c = scene
        .create_texture(&checker_pixels(), 2, 2, 4, TextureFormat::Rgba8Unorm)
        .unwrap();

    scene.new_frame();
    a.descriptor().unwrap();
    b.descriptor().unwrap();
    assert!(matches!(
        c.descriptor(),
        Err(SceneError::DescriptorHeapExhausted { capacity: 2 })
    ));

    // The next frame starts from an empty dynamic region.
    scene.new_frame();
    c.descriptor().unwrap();
}

#[test]
fn post_present_signal_precedes_the_shutdown_wait() {
    let (mock, _, scene) = setup(&SceneConfig::default());
    scene.on_resize(2).unwrap();

    scene.new_frame();
    let draw_data = ui_frame(&scene);
    scene.render(&draw_data, 0).unwrap();
    scene.on_post_present().unwrap();
    scene.wait_for_last_submitted_frame().unwrap();

    let log = mock.call_log();
    let signal = log
        .iter()
        .position(|c| matches!(c, MockCall::SignalFence { value: 1, .. }))
        .unwrap();
    assert!(signal > 0);
    // The mock completes signals instantly, so the wait short-circuits on
    // the completed value instead of blocking.
    assert!(!log.iter().any(
        |c| matches!(c, MockCall::WaitFence { value: 1, .. })
    ));
}

#[test]
fn wait_without_an_outstanding_frame_is_a_no_op() {
    let (mock, _, scene) = setup(&SceneConfig::default());
    let before = mock.call_log().len();

    scene.wait_for_last_submitted_frame().unwrap();
    assert_eq!(mock.call_log().len(), before);
}

#[test]
fn frame_fence_values_advance_with_each_present() {
    let (mock, _, scene) = setup(&SceneConfig::default());

    scene.on_post_present().unwrap();
    scene.on_post_present().unwrap();
    scene.on_post_present().unwrap();

    let values: Vec<u64> = mock
        .call_log()
        .iter()
        .filter_map(|c| match c {
            MockCall::SignalFence { value, .. } => Some(*value),
            _ => None,
        })
        .collect();
    assert_eq!(values, vec![1, 2, 3]);
}

#[test]
fn shutdown_waits_for_the_last_presented_frame() {
    let (mock, _, scene) = setup(&SceneConfig::default());
    scene.on_resize(2).unwrap();
    scene.on_post_present().unwrap();

    drop(scene);

    // Shutdown released the command list and every back-buffer reference.
    assert_eq!(mock.swapchain_ref_count(0), 0);
    assert_eq!(mock.swapchain_ref_count(1), 0);
}
