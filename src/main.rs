use anaflow::client::AnalyticsClient;
use anaflow::session::SessionStore;
use anaflow::{App, AppConfig, AppEvent, Args, ConfigManager, RuntimeOptions, APP_NAME};
use clap::Parser;
use color_eyre::Result;
use ratatui::DefaultTerminal;
use std::sync::mpsc::channel;
use std::time::Duration;

fn render(terminal: &mut DefaultTerminal, app: &mut App) -> Result<()> {
    terminal.draw(|frame| frame.render_widget(app, frame.area()))?;
    Ok(())
}

fn run(
    mut terminal: DefaultTerminal,
    args: &Args,
    dataset_id: &str,
    config: &AppConfig,
) -> Result<Option<String>> {
    let options = RuntimeOptions::from_args_and_config(args, config)?;

    let client = AnalyticsClient::new(
        &options.server_url,
        Duration::from_secs(config.server.timeout_secs),
    );
    let session_store = SessionStore::new(options.token_file.clone());

    let mut effective = config.clone();
    effective.display.placeholder = options.placeholder.clone();

    let (tx, rx) = channel::<AppEvent>();
    let mut app = App::new(tx.clone(), client, session_store, &effective);
    if options.debug {
        app.enable_debug();
    }
    if options.chat_open {
        app.set_chat_open(true);
    }

    render(&mut terminal, &mut app)?;
    tx.send(AppEvent::Open(dataset_id.to_string()))?;

    let poll_interval = Duration::from_millis(effective.display.event_poll_interval_ms);
    loop {
        if crossterm::event::poll(poll_interval)? {
            match crossterm::event::read()? {
                crossterm::event::Event::Key(key) => tx.send(AppEvent::Key(key))?,
                crossterm::event::Event::Resize(cols, rows) => {
                    tx.send(AppEvent::Resize(cols, rows))?
                }
                _ => {}
            }
        }

        let updated = match rx.recv_timeout(Duration::from_millis(0)) {
            Ok(event) => {
                match event {
                    AppEvent::Exit => break,
                    AppEvent::Crash(msg) => {
                        return Err(color_eyre::eyre::eyre!(msg));
                    }
                    event => {
                        if let Some(event) = app.event(&event) {
                            tx.send(event)?;
                        }
                    }
                }
                true
            }
            Err(std::sync::mpsc::RecvTimeoutError::Timeout) => false,
            Err(std::sync::mpsc::RecvTimeoutError::Disconnected) => break,
        };

        if updated {
            render(&mut terminal, &mut app)?;
        }
    }

    Ok(app.sign_off())
}

fn main() -> Result<()> {
    let args = Args::parse();
    color_eyre::install()?;

    if args.init_config {
        let config_manager = ConfigManager::new(APP_NAME)?;
        let path = config_manager.write_default_config(args.force)?;
        println!("Wrote default config to {}", path.display());
        return Ok(());
    }

    let dataset_id = args
        .dataset_id
        .clone()
        .ok_or_else(|| color_eyre::eyre::eyre!("a dataset id is required"))?;

    let config = AppConfig::load(APP_NAME).unwrap_or_else(|e| {
        eprintln!("Warning: failed to load config: {}. Using defaults.", e);
        AppConfig::default()
    });

    let terminal = ratatui::init();
    let result = run(terminal, &args, &dataset_id, &config);
    ratatui::restore();

    match result {
        Ok(Some(sign_off)) => {
            eprintln!("{}", sign_off);
            std::process::exit(1);
        }
        Ok(None) => Ok(()),
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    }
}
