//! Native command line front-end.

#[cfg(not(target_arch = "wasm32"))]
mod cli {
    use std::path::PathBuf;
    use std::process::ExitCode;

    use captioner::model::{BoundingRect, PointerEvent};
    use captioner::surface::RasterBackend;
    use captioner::surface::font::load_font;
    use captioner::{
        AppConfig, DirectorySink, Editor, FileStorage, LogLevel, Message, SelectedFile, session,
    };
    use clap::{Args, Parser, Subcommand};

    #[derive(Parser, Debug)]
    #[command(
        name = "captioner",
        version,
        about = "Caption an image with draggable text and export it as PNG"
    )]
    struct Cli {
        /// Configuration file (default: platform config directory)
        #[arg(long, global = true)]
        config: Option<PathBuf>,

        /// Storage file holding the uploaded image
        #[arg(long, global = true)]
        storage: Option<PathBuf>,

        /// Log level: error, warn, info, debug or trace
        #[arg(long, global = true)]
        log_level: Option<String>,

        #[command(subcommand)]
        command: Commands,
    }

    #[derive(Subcommand, Debug)]
    enum Commands {
        /// Upload an image; opens a file picker when no path is given
        Upload {
            /// Image files; only the first PNG or JPEG is used
            files: Vec<PathBuf>,
        },
        /// Show the stored image and session state
        Status,
        /// Forget the stored image
        Clear,
        /// Caption the stored image and write result_image.png
        Export(ExportArgs),
        /// Read editing commands from stdin or a script file
        Session {
            /// Script file instead of stdin
            #[arg(long)]
            script: Option<PathBuf>,
        },
        /// Inspect or create the configuration file
        #[command(subcommand)]
        Config(ConfigCommand),
    }

    #[derive(Args, Debug)]
    struct ExportArgs {
        /// Caption text
        #[arg(long, default_value = "")]
        text: String,
        /// Font size in pixels
        #[arg(long, default_value_t = captioner::constants::DEFAULT_FONT_SIZE_PX, allow_negative_numbers = true)]
        size: i32,
        /// Left edge of the text, pixels from the image's left
        #[arg(long, default_value_t = 0.0, allow_negative_numbers = true)]
        x: f32,
        /// Top edge of the text box, pixels from the image's top
        #[arg(long, default_value_t = 0.0, allow_negative_numbers = true)]
        y: f32,
        /// Output directory (default: from config, else the working directory)
        #[arg(long)]
        out: Option<PathBuf>,
    }

    #[derive(Subcommand, Debug)]
    enum ConfigCommand {
        /// Print the effective configuration
        Show,
        /// Write a default configuration file
        Init {
            /// Overwrite an existing file
            #[arg(long)]
            force: bool,
        },
    }

    fn load_config(path: Option<&PathBuf>) -> Result<AppConfig, String> {
        match path {
            Some(path) => AppConfig::load(path).map_err(|e| format!("{:?}: {}", path, e)),
            None => Ok(AppConfig::load_from_default_path().unwrap_or_default()),
        }
    }

    fn init_logging(cli: &Cli, config: &AppConfig) -> Result<(), String> {
        let level = match cli.log_level.as_deref() {
            Some(name) => {
                LogLevel::from_name(name).ok_or_else(|| format!("Unknown log level '{}'", name))?
            }
            None => config.preferences.log_level,
        };
        env_logger::Builder::new()
            .filter_level(level.to_level_filter())
            .parse_default_env()
            .init();
        Ok(())
    }

    fn open_editor(cli: &Cli, config: &AppConfig, out: Option<PathBuf>) -> Result<Editor, String> {
        let storage_path = cli
            .storage
            .clone()
            .or_else(|| config.preferences.storage_path().map(PathBuf::from))
            .or_else(FileStorage::default_path)
            .ok_or("Could not determine a storage location; pass --storage")?;
        let storage = FileStorage::open(&storage_path)
            .map_err(|e| format!("{:?}: {}", storage_path, e))?;
        log::debug!("Using storage {:?}", storage.path());

        let font = load_font(config.preferences.font_path());
        let backend = RasterBackend::new(font, config.preferences.text_color);
        let sink = DirectorySink::new(out.unwrap_or_else(|| config.preferences.output_dir()));

        Ok(Editor::new(
            Box::new(storage),
            Box::new(backend),
            Box::new(sink),
            &config.preferences.font_family,
        ))
    }

    fn pick_files() -> Vec<PathBuf> {
        rfd::FileDialog::new()
            .add_filter("Images", &["png", "jpg", "jpeg"])
            .set_title("Upload Image")
            .pick_files()
            .unwrap_or_default()
    }

    fn upload(editor: &mut Editor, files: Vec<PathBuf>) -> Result<(), String> {
        let files = if files.is_empty() { pick_files() } else { files };
        if files.is_empty() {
            println!("No file selected");
            return Ok(());
        }

        let selected = files.iter().map(SelectedFile::from_path).collect();
        if editor.select_files(selected) == 0 {
            return Err("No PNG or JPEG image among the selected files".to_string());
        }
        match editor.confirm_upload().map_err(|e| e.to_string())? {
            Some(image) => println!(
                "Uploaded {} ({} byte data URL)",
                image.mime().as_str(),
                image.data_url().len()
            ),
            None => println!("Nothing uploaded"),
        }
        Ok(())
    }

    fn export(editor: &mut Editor, args: &ExportArgs) -> Result<(), String> {
        let messages = [
            Message::AddText,
            Message::TextChanged(args.text.clone()),
            Message::FontSizeChanged(args.size),
            Message::FinishEditing,
            Message::DragStarted {
                pointer: PointerEvent::new(args.x, args.y),
                element: BoundingRect::default(),
            },
            Message::DragEnded,
        ];
        for message in messages {
            editor.update(message).map_err(|e| e.to_string())?;
        }

        let (artifact, location) = editor.export().map_err(|e| e.to_string())?;
        println!(
            "Exported {}x{} image to {}",
            artifact.width, artifact.height, location
        );
        Ok(())
    }

    fn config_command(cli: &Cli, config: &AppConfig, command: &ConfigCommand) -> Result<(), String> {
        match command {
            ConfigCommand::Show => {
                let json = config.to_json().map_err(|e| e.to_string())?;
                println!("{}", json);
            }
            ConfigCommand::Init { force } => {
                let path = cli
                    .config
                    .clone()
                    .or_else(AppConfig::default_path)
                    .ok_or("Could not determine config directory")?;
                if path.exists() && !force {
                    return Err(format!("{:?} exists; use --force to overwrite", path));
                }
                AppConfig::new().save(&path).map_err(|e| e.to_string())?;
                println!("Wrote {}", path.display());
            }
        }
        Ok(())
    }

    fn execute(cli: &Cli, config: &AppConfig) -> Result<bool, String> {
        match &cli.command {
            Commands::Config(command) => config_command(cli, config, command)?,
            Commands::Upload { files } => {
                let mut editor = open_editor(cli, config, None)?;
                upload(&mut editor, files.clone())?;
            }
            Commands::Status => {
                let editor = open_editor(cli, config, None)?;
                println!("{}", session::status_report(&editor));
            }
            Commands::Clear => {
                let mut editor = open_editor(cli, config, None)?;
                editor.clear_image().map_err(|e| e.to_string())?;
                println!("Cleared stored image");
            }
            Commands::Export(args) => {
                let mut editor = open_editor(cli, config, args.out.clone())?;
                export(&mut editor, args)?;
            }
            Commands::Session { script } => {
                let mut editor = open_editor(cli, config, None)?;
                let stdout = std::io::stdout();
                let failures = match script {
                    Some(path) => {
                        let file = std::fs::File::open(path)
                            .map_err(|e| format!("{:?}: {}", path, e))?;
                        session::run(&mut editor, std::io::BufReader::new(file), stdout.lock())
                    }
                    None => session::run(&mut editor, std::io::stdin().lock(), stdout.lock()),
                }
                .map_err(|e| e.to_string())?;
                return Ok(failures == 0);
            }
        }
        Ok(true)
    }

    pub fn main() -> ExitCode {
        let cli = Cli::parse();

        let config = match load_config(cli.config.as_ref()) {
            Ok(config) => config,
            Err(e) => {
                eprintln!("Failed to load configuration: {}", e);
                return ExitCode::FAILURE;
            }
        };
        if let Err(e) = init_logging(&cli, &config) {
            eprintln!("{}", e);
            return ExitCode::FAILURE;
        }

        match execute(&cli, &config) {
            Ok(true) => ExitCode::SUCCESS,
            Ok(false) => ExitCode::FAILURE,
            Err(e) => {
                eprintln!("Error: {}", e);
                ExitCode::FAILURE
            }
        }
    }
}

#[cfg(not(target_arch = "wasm32"))]
fn main() -> std::process::ExitCode {
    cli::main()
}

// WASM doesn't use main(), it uses wasm_bindgen's start function
#[cfg(target_arch = "wasm32")]
fn main() {}
