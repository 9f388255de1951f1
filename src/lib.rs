pub mod app;
pub mod demo_scenes;
pub mod device;
pub mod renderer;
pub mod settings;
pub mod time;

pub use app::{App, AppError};
pub use renderer::Renderer3D;
pub use settings::RenderSettings;

use winit::event_loop::EventLoop;

fn init_logging() {
    let _ = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .try_init();
}

/// Runs the windowed demo until the window closes.
pub fn run() -> Result<(), AppError> {
    init_logging();

    log::info!("Starting hg renderer demo");

    let settings = RenderSettings::load();
    let event_loop = EventLoop::new()?;
    let mut app = App::new(settings);

    event_loop.run_app(&mut app)?;

    if let Some(err) = app.take_error() {
        return Err(err);
    }

    log::info!("Application shutdown complete");
    Ok(())
}
