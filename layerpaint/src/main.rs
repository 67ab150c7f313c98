#![warn(clippy::pedantic)]

mod session;

use anyhow::Result as AnyResult;
use layerpaint_core::{
    commands::DefaultCommandFactory,
    config::EngineConfig,
    queue::{AsyncCommandManager, CommandManager, DefaultCommandManager},
    state::{Layer, LayerModel, SharedLayerModel},
};

/// A fresh document: a single blank layer, selected.
fn blank_document(config: &EngineConfig) -> SharedLayerModel {
    let mut model = LayerModel::new(config.width, config.height);
    let layer = Layer::empty(config.width, config.height);
    let id = layer.id();
    // Empty model, index 0 is always in range.
    let _ = model.add_layer_at(0, layer);
    model.set_current_layer(id);
    model.into_shared()
}

fn print_summary(model: &LayerModel) {
    let current = model.current_layer_id();
    let mut total = 0;
    println!("{} layer(s), {}x{}:", model.layer_count(), model.width(), model.height());
    for (index, layer) in model.iter().enumerate() {
        let bytes = layer.surface_bytes();
        total += bytes;
        println!(
            "{marker} {index:>3} {name:<16} {mode:<8} {opacity:>5.2} {visible:<7} {size}",
            marker = if Some(layer.id()) == current { '*' } else { ' ' },
            name = layer.name,
            mode = layer.blend.mode.as_ref(),
            opacity = layer.blend.opacity,
            visible = if layer.visible { "shown" } else { "hidden" },
            size = human_bytes::human_bytes(bytes as f64),
        );
    }
    println!(
        "{} detached for history, {} in stack",
        model.detached_count(),
        human_bytes::human_bytes(total as f64)
    );
}

fn main() -> AnyResult<()> {
    let has_term = std::io::IsTerminal::is_terminal(&std::io::stdin());
    // Log to a terminal, if available. Else, log to "log.out" in the working directory.
    if has_term {
        env_logger::builder()
            .filter_level(log::LevelFilter::Debug)
            .init();
    } else {
        let _ = simple_logging::log_to_file("log.out", log::LevelFilter::Debug);
    }

    let config = match EngineConfig::default_path() {
        Some(path) if path.exists() => EngineConfig::load_or_default(&path),
        Some(_) => {
            let config = EngineConfig::default();
            if let Err(e) = config.save_default() {
                log::warn!("Failed to save default engine config:\n{e:?}");
            }
            config
        }
        None => {
            log::warn!("No preferences directory, using default engine config");
            EngineConfig::default()
        }
    };
    log::debug!("{config:?}");

    // Args are a simple list of session files, each replayed on its own blank document.
    let paths: Vec<std::path::PathBuf> = std::env::args_os().skip(1).map(Into::into).collect();
    if paths.is_empty() {
        log::warn!("No session files given");
    }
    let mut failures = 0usize;
    for path in paths {
        let session = match session::Session::load(&path) {
            Ok(session) => session,
            Err(e) => {
                log::error!("failed to open session {path:?}: {e:#}");
                failures += 1;
                continue;
            }
        };
        let manager = AsyncCommandManager::new(DefaultCommandManager::new(
            blank_document(&config),
            &config,
        ))?;
        let completions = session.run(&DefaultCommandFactory, &manager)?;
        for (op, completion) in session.ops.iter().zip(&completions) {
            match &completion.result {
                Ok(()) => log::info!("{}: ok", op.as_ref()),
                Err(e) => log::warn!("{}: {e}", op.as_ref()),
            }
        }
        manager.shutdown();

        println!("{}", path.display());
        print_summary(&manager.layer_model().read());
    }
    if failures > 0 {
        anyhow::bail!("{failures} session(s) failed to load");
    }
    Ok(())
}
