//! Full viewer runs against the virtual capture device

mod common;

use common::{init_tracing, CollectingSink, RecordingDevice};
use deckview::capture::{CaptureDevice, ModeId, VirtualDevice, VirtualDeviceConfig};
use deckview::config::ViewerConfig;
use deckview::render::{Display, HeadlessBackend, HeadlessDisplay, RenderLoop};
use deckview::video::PixelFormat;
use deckview::{Viewer, ViewerState};
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

fn start_viewer(device: Arc<dyn CaptureDevice>, sink: CollectingSink) -> Viewer {
    Viewer::init(device, &ViewerConfig::default(), move |_| Ok(sink)).unwrap()
}

fn render_loop(viewer: &Viewer, frames: u64) -> RenderLoop<HeadlessDisplay, HeadlessBackend> {
    RenderLoop::new(
        HeadlessDisplay::new(1920, 1080, 60).with_frame_limit(frames),
        HeadlessBackend::new(),
        viewer.frames(),
        0.25,
        viewer.stop_flag(),
    )
    .unwrap()
}

#[test]
fn test_virtual_device_end_to_end() {
    init_tracing();
    let device = Arc::new(VirtualDevice::new(0, VirtualDeviceConfig::default()).unwrap());
    let sink = CollectingSink::default();
    let mut viewer = start_viewer(device.clone(), sink.clone());
    let mut render = render_loop(&viewer, 60);

    let stats = viewer.run(&mut render).unwrap();

    assert_eq!(viewer.state(), ViewerState::Stopped);
    assert!(!device.is_streaming());

    let handler = viewer.handler_stats();
    assert_eq!(handler.reconfigurations, 1);
    assert!(handler.frames_accepted > 0);
    assert!(handler.audio_packets > 0);

    assert!(stats.frames_drawn > 0);
    assert_eq!(render.backend().last_upload().unwrap().texture_width, 960);
    assert!(sink.writes() > 0);
    // 1600 sample frames per 1080p30 packet, 4 bytes each
    assert_eq!(sink.bytes().len() % 6400, 0);
}

#[test]
fn test_signal_change_reconfigures_and_resizes() {
    init_tracing();
    let device = Arc::new(VirtualDevice::new(0, VirtualDeviceConfig::default()).unwrap());
    let mut viewer = start_viewer(device.clone(), CollectingSink::default());
    let mut render = render_loop(&viewer, 60);

    let switcher = {
        let device = device.clone();
        thread::spawn(move || {
            thread::sleep(Duration::from_millis(300));
            device.set_signal(ModeId::HD720P60, false, 10).unwrap();
        })
    };

    viewer.run(&mut render).unwrap();
    switcher.join().unwrap();

    assert_eq!(viewer.handler_stats().reconfigurations, 2);
    let geometry = viewer.frames().geometry();
    assert_eq!((geometry.width, geometry.height), (1280, 720));
    assert_eq!(geometry.pixel_format, PixelFormat::Yuv10);
    assert_eq!(render.display().window_rect().width, 1280);
}

#[test]
fn test_rgb_signal_is_sized_but_not_drawn() {
    init_tracing();
    let device = Arc::new(
        VirtualDevice::new(
            0,
            VirtualDeviceConfig {
                rgb: true,
                depth: 10,
                ..Default::default()
            },
        )
        .unwrap(),
    );
    let mut viewer = start_viewer(device, CollectingSink::default());
    let mut render = render_loop(&viewer, 20);

    let stats = viewer.run(&mut render).unwrap();

    assert_eq!(viewer.frames().geometry().pixel_format, PixelFormat::Rgb10);
    assert_eq!(stats.frames_drawn, 0);
}

#[test]
fn test_missing_signal_drops_frames() {
    init_tracing();
    let device = Arc::new(
        VirtualDevice::new(
            0,
            VirtualDeviceConfig {
                has_signal: false,
                ..Default::default()
            },
        )
        .unwrap(),
    );
    let mut viewer = start_viewer(device, CollectingSink::default());
    let mut render = render_loop(&viewer, 20);

    viewer.run(&mut render).unwrap();

    let stats = viewer.handler_stats();
    assert_eq!(stats.frames_accepted, 0);
    assert!(stats.frames_no_signal > 0);
    assert_eq!(stats.reconfigurations, 0);
}

#[test]
fn test_stop_flag_ends_run() {
    init_tracing();
    let device = Arc::new(VirtualDevice::new(0, VirtualDeviceConfig::default()).unwrap());
    let mut viewer = start_viewer(device, CollectingSink::default());
    // No frame limit: only the stop flag ends this run
    let mut render = RenderLoop::new(
        HeadlessDisplay::new(1920, 1080, 60),
        HeadlessBackend::new(),
        viewer.frames(),
        0.25,
        viewer.stop_flag(),
    )
    .unwrap();

    let stop = viewer.stop_flag();
    let stopper = thread::spawn(move || {
        thread::sleep(Duration::from_millis(200));
        stop.store(true, Ordering::SeqCst);
    });

    viewer.run(&mut render).unwrap();
    stopper.join().unwrap();
    assert_eq!(viewer.state(), ViewerState::Stopped);
}

#[test]
fn test_teardown_order() {
    init_tracing();
    let device = Arc::new(RecordingDevice::default());
    let mut viewer = start_viewer(device.clone(), CollectingSink::default());
    let mut render = render_loop(&viewer, 2);

    viewer.run(&mut render).unwrap();

    assert_eq!(
        device.commands(),
        vec![
            "listen",
            "enable video Hp30 8-bit YUV",
            "enable audio 16",
            "start",
            "stop",
            "disable audio",
            "disable video",
            "unlisten",
        ]
    );
    assert!(device.listener.lock().is_none());
}

#[test]
fn test_second_run_is_rejected() {
    init_tracing();
    let device = Arc::new(RecordingDevice::default());
    let mut viewer = start_viewer(device, CollectingSink::default());
    let mut render = render_loop(&viewer, 1);
    viewer.run(&mut render).unwrap();
    assert!(viewer.run(&mut render).is_err());
}

#[test]
fn test_audio_from_stream_start_is_played() {
    init_tracing();
    let packet: Vec<u8> = (0..16).collect();
    let device = Arc::new(RecordingDevice {
        audio_on_start: Some(packet.clone()),
        ..Default::default()
    });
    let sink = CollectingSink::default();
    let mut viewer = start_viewer(device, sink.clone());
    let mut render = render_loop(&viewer, 6);

    viewer.run(&mut render).unwrap();

    assert_eq!(viewer.handler_stats().audio_packets, 1);
    assert_eq!(sink.bytes(), packet);
}
