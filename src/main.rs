use anyhow::Result;
use glow::HasContext;
use glutin::{Api, ContextBuilder, GlProfile, GlRequest};
use log::{info, warn};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;
use winit::dpi::LogicalSize;
use winit::event::{Event, WindowEvent};
use winit::event_loop::{ControlFlow, EventLoop};
use winit::platform::run_return::EventLoopExtRunReturn;
use winit::window::WindowBuilder;
use xrbridge::{BridgeConfig, Eye, GlowGraphics, OpenXrRuntime, PumpStatus, XrBridge};

const APP_NAME: &str = "xrbridge demo";

type Bridge = XrBridge<OpenXrRuntime, GlowGraphics>;

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    // Handle interrupts gracefully
    let running = Arc::new(AtomicBool::new(true));
    let r = running.clone();
    ctrlc::set_handler(move || {
        r.store(false, Ordering::Relaxed);
    })?;

    // The session binds to whatever context is current, so it has to exist first
    let mut event_loop = EventLoop::new();
    let window = WindowBuilder::new()
        .with_title(APP_NAME)
        .with_inner_size(LogicalSize::new(640.0, 480.0));
    let context = ContextBuilder::new()
        .with_gl(GlRequest::Specific(Api::OpenGl, (4, 4)))
        .with_gl_profile(GlProfile::Core)
        .build_windowed(window, &event_loop)?;
    let context = unsafe { context.make_current() }.map_err(|(_, e)| e)?;
    let gl = unsafe {
        glow::Context::from_loader_function(|s| context.get_proc_address(s) as *const _)
    };

    let config = BridgeConfig::from_env()?;
    let bridge = XrBridge::new(OpenXrRuntime::load()?, GlowGraphics::new(gl), config);

    let result = run(&bridge, &mut event_loop, &running);
    if let Err(e) = bridge.free() {
        warn!("Failed to release OpenXR resources: {}", e);
    }
    result
}

fn run(bridge: &Bridge, event_loop: &mut EventLoop<()>, running: &AtomicBool) -> Result<()> {
    bridge.init(APP_NAME)?;

    let mut exit_requested = false;
    loop {
        let mut close_requested = false;
        event_loop.run_return(|event, _, control_flow| {
            *control_flow = ControlFlow::Poll;
            match event {
                Event::WindowEvent {
                    event: WindowEvent::CloseRequested,
                    ..
                } => close_requested = true,
                Event::MainEventsCleared => *control_flow = ControlFlow::Exit,
                _ => (),
            }
        });

        let quit = close_requested || !running.load(Ordering::Relaxed);
        if quit && !exit_requested {
            info!("Requesting exit");
            exit_requested = true;
            if !bridge.request_exit()? {
                info!("No session running, exiting");
                return Ok(());
            }
        }

        if let PumpStatus::Exit(reason) = bridge.update()? {
            info!("Runtime ended the session ({:?})", reason);
            return Ok(());
        }

        if !bridge.is_session_running() {
            // Don't grind up the CPU
            std::thread::sleep(Duration::from_millis(100));
            continue;
        }

        let gl = bridge.graphics().gl();
        bridge.render(|frame| {
            let (r, g, b) = match frame.eye {
                Eye::Left => (0.8, 0.2, 0.2),
                Eye::Right => (0.2, 0.2, 0.8),
            };
            frame.framebuffer.bind(gl);
            unsafe {
                gl.clear_color(r, g, b, 1.0);
                gl.clear(glow::COLOR_BUFFER_BIT | glow::DEPTH_BUFFER_BIT);
            }
        })?;
    }
}
