use {
    crate::{
        backend::{DisplayDriver, RenderBackend, Window, WindowId, WindowIds},
        backends::headless::{HeadlessDisplay, HeadlessRenderer},
        cli::{GlobalArgs, RunArgs},
        config::{ConfigError, WmConfig},
        format::PixelFormat,
        input::InputMessage,
        logger::{Logger, LoggerError},
        proxy::{ProxyError, UiDriverProxy},
        rect::Rect,
        root::{RootContainer, RootError},
        time::{Clock, MonotonicClock},
        utils::errorfmt::ErrorFmt,
        vsync::VsyncInfo,
        wheel::Wheel,
    },
    log::Level,
    std::{cell::Cell, rc::Rc, time::Duration},
    thiserror::Error,
};

const DISPLAY_WIDTH: i32 = 480;
const DISPLAY_HEIGHT: i32 = 272;

#[derive(Debug, Error)]
enum MainError {
    #[error("Could not install the logger")]
    Logger(#[from] LoggerError),
    #[error("Could not load the config")]
    Config(#[from] ConfigError),
    #[error("The root container caused an error")]
    Root(#[from] RootError),
    #[error("The demo window caused an error")]
    Proxy(#[from] ProxyError),
    #[error("No vsync is scheduled")]
    Stalled,
}

pub fn main(global: GlobalArgs, args: RunArgs) {
    if let Err(e) = run(global, args) {
        if log::log_enabled!(Level::Error) {
            log::error!("A fatal error occurred: {}", ErrorFmt(e));
        } else {
            eprintln!("A fatal error occurred: {}", ErrorFmt(e));
        }
        std::process::exit(1);
    }
}

/// A window that asks for a frame on every tick and fills a strip of its
/// buffer each time.
struct DemoWindow {
    id: WindowId,
    pending: Cell<bool>,
}

impl Window for DemoWindow {
    fn id(&self) -> WindowId {
        self.id
    }

    fn on_vsync(&self, vsync: &VsyncInfo) {
        log::trace!("Demo window woken by vsync {}", vsync.seq);
        self.pending.set(true);
    }

    fn handle_input(&self, msg: &InputMessage) -> bool {
        log::debug!("Demo window received {:?}", msg);
        true
    }

    fn client_visible(&self) -> bool {
        true
    }
}

fn run(global: GlobalArgs, args: RunArgs) -> Result<(), MainError> {
    let logger = Logger::install_stderr(global.log_level.unwrap_or_default().into())?;
    let mut config = match &args.config {
        Some(path) => WmConfig::load(path)?,
        None => WmConfig::default(),
    };
    if let Some(level) = global.log_level {
        config.log_level = level;
    }
    if let Some(source) = args.vsync_source {
        config.vsync_source = source;
    }
    if let Some(ms) = args.refresh_period_ms {
        config.refresh_period_ms = ms;
    }
    config.trace_frames |= args.trace_frames;
    logger.set_level(config.log_level.into());
    log::info!("Config: {:?}", config);

    let root_config = config.root_config();
    let clock: Rc<dyn Clock> = Rc::new(MonotonicClock);
    let wheel = Wheel::new(&clock);
    let display = Rc::new(HeadlessDisplay::new(
        DISPLAY_WIDTH,
        DISPLAY_HEIGHT,
        Some(root_config.refresh_period),
        false,
    ));
    let render = Rc::new(HeadlessRenderer::default());
    let dyn_display: Rc<dyn DisplayDriver> = display.clone();
    let dyn_render: Rc<dyn RenderBackend> = render.clone();
    let root = RootContainer::new(&dyn_display, &dyn_render, &wheel, &clock, &root_config)?;

    let ids = WindowIds::default();
    let demo = Rc::new(DemoWindow {
        id: ids.next(),
        pending: Cell::new(false),
    });
    let dyn_demo: Rc<dyn Window> = demo.clone();
    let proxy = root.create_proxy(&dyn_demo, PixelFormat::Argb8888)?;
    root.invalidate(demo.id, true)?;
    root.show_toast("wm-sync", Duration::from_secs(1));

    let mut frames = 0;
    while frames < args.frames {
        let Some(next) = wheel.next_expiration() else {
            return Err(MainError::Stalled);
        };
        let now = clock.now();
        if next > now {
            std::thread::sleep(next - now);
        }
        wheel.dispatch();
        if demo.pending.replace(false) {
            draw(&proxy, frames)?;
            display.run_frame();
            frames += 1;
        }
    }

    log::info!(
        "Produced {} frames, rendered {} buffers",
        frames,
        render.rendered()
    );
    root.trace_frame(false);
    root.shutdown();
    Ok(())
}

fn draw(proxy: &UiDriverProxy, frame: u64) -> Result<(), MainError> {
    let buffer = proxy.on_dequeue_buffer()?;
    let strip = 8;
    let y = ((frame % 1024) as i32 * strip) % buffer.height.max(1);
    if let Some(rect) = Rect::new_sized(0, y, buffer.width, strip) {
        proxy.on_rect_crop(rect);
    }
    proxy.on_queue_buffer(buffer.handle)?;
    Ok(())
}
