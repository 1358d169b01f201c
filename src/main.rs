use std::rc::Rc;

use anyhow::{Context, Result};
use clap::Parser;

use resolution_control::config::{Options, Resolution};
use resolution_control::graphics::buffer::{BufferRef, BufferSpec, PlatformFlags, RenderBuffer};
use resolution_control::graphics::soft::{SoftBuffer, SoftDevice, SoftFactory};
use resolution_control::graphics::{FixedWindow, LogProfiler, ScaleState, ScaledWindow, WriteTargetSlot};
use resolution_control::logging::{init_logging, LogLevel};
use resolution_control::store::{ConfigStore, NullStore, PropFileStore};
use resolution_control::{Cli, HostServices, ScalingController};

fn main() -> Result<()> {
    let cli = Cli::parse();
    let options = cli.merge_into_options(Options::default())?;

    init_logging(LogLevel::from_i32(options.log_level));
    log::info!("rescontrol starting");

    let mut store: Box<dyn ConfigStore> = match &options.config_file {
        Some(path) => Box::new(PropFileStore::new(path)),
        None => Box::new(NullStore),
    };
    let config = options.apply_to(store.load().context("Failed to load config")?);

    log::info!("Configuration:");
    log::info!(
        "  Window: {}x{}",
        options.window.width,
        options.window.height
    );
    log::info!("  Scale factor: {}", config.scale_factor);
    log::info!("  Upscale: {}", config.upscale_algorithm);
    log::info!("  Downscale: {}", config.downscale_algorithm);

    let device = SoftDevice::new();
    let output = SoftBuffer::shared(
        &device,
        BufferSpec::with_depth(options.window.width, options.window.height),
        "output",
    )?;
    output.borrow_mut().begin_write(true)?;
    let output_ref: BufferRef = output.clone();

    let window = Rc::new(FixedWindow::new(options.window.width, options.window.height));
    let state = ScaleState::shared(config.scale_factor);
    let host = HostServices {
        window: Rc::new(ScaledWindow::new(Rc::clone(&window), Rc::clone(&state))),
        factory: Box::new(SoftFactory::new(Rc::clone(&device))),
        target: WriteTargetSlot::shared_with(output_ref),
        store,
        profiler: Box::new(LogProfiler),
    };
    let mut controller = ScalingController::with_state(host, config, state)?;

    let resize_at = options.resize_to.map(|size| (options.frames / 2, size));
    for frame in 0..options.frames {
        if let Some((at, size)) = resize_at {
            if frame == at {
                resize_window(&window, &output, &mut controller, size)?;
            }
        }
        render_frame(&device, &mut controller, frame)?;
    }

    log::info!(
        "rendered {} frame(s), {} resample draw(s)",
        options.frames,
        device.draw_count()
    );

    if let Some(path) = &options.output {
        let image = output.borrow().to_image()?;
        image
            .save(path)
            .with_context(|| format!("Failed to write {}", path))?;
        log::info!("wrote {}x{} frame to {}", image.width(), image.height(), path);
    }

    Ok(())
}

/// One host frame. Only the world pass goes through the scaler.
fn render_frame(device: &SoftDevice, controller: &mut ScalingController, frame: u32) -> Result<()> {
    controller.set_should_scale(true)?;
    let (width, height) = device.bound_size().unwrap_or((1, 1));
    log::trace!("frame {}: world pass at {}x{}", frame, width, height);
    device.paint_bound(|x, y| world_pattern(x, y, width, height, frame))?;
    controller.set_should_scale(false)?;
    Ok(())
}

/// Checkerboard with a horizontal gradient, shifted by the frame number.
fn world_pattern(x: u32, y: u32, width: u32, height: u32, frame: u32) -> [u8; 4] {
    let cell = (width.max(height) / 16).max(1);
    let checker = ((x / cell) + (y / cell) + frame) % 2 == 0;
    let r = (x * 255 / width.max(1)) as u8;
    let g = (y * 255 / height.max(1)) as u8;
    let b = if checker { 224 } else { 32 };
    [r, g, b, 255]
}

fn resize_window(
    window: &FixedWindow,
    output: &std::cell::RefCell<SoftBuffer>,
    controller: &mut ScalingController,
    size: Resolution,
) -> Result<()> {
    log::info!("resizing window to {}x{}", size.width, size.height);
    window.set_size(size.width, size.height);
    output
        .borrow_mut()
        .resize(size.width, size.height, PlatformFlags::CURRENT)?;
    controller.on_resolution_changed()?;
    Ok(())
}
