use clap::{Parser, Subcommand};
use provmap::{MaskSynthesizer, PipelineConfig};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// Извлечение провинций и владельцев из карт Chronicles of Realms
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Выделить провинции из маски и определить владельцев по стартовой карте
    Extract {
        /// Путь к конфигурационному файлу в формате TOML
        #[arg(short, long)]
        config: PathBuf,

        /// Каталог для таблиц (перекрывает `[output] dir`)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Синтезировать маску провинций по параметрам `[synth]`
    Synth {
        /// Путь к конфигурационному файлу в формате TOML
        #[arg(short, long)]
        config: PathBuf,

        /// Путь для сохранения маски
        #[arg(short, long)]
        output: PathBuf,

        /// Путь для уменьшенного превью
        #[arg(long)]
        preview: Option<PathBuf>,

        /// Ширина превью в пикселях
        #[arg(long, default_value_t = 512)]
        preview_width: u32,
    },
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Extract { config, output } => {
            println!("🔍 Загрузка конфигурации...");
            let mut params = PipelineConfig::from_toml_file(&config)?;
            if let Some(dir) = output {
                params.output.dir = dir;
            }

            let report = provmap::run(&params)?;

            println!(
                "Карта {}×{}: {} провинций, {} наций",
                report.width, report.height, report.provinces, report.nations
            );
            if report.synthesized {
                println!("Маска синтезирована (нет авторской маски)");
            }
            if report.unmapped_colors > 0 {
                println!(
                    "Внимание: {} цветов владельцев нет в реестре, см. unmapped_owners.csv",
                    report.unmapped_colors
                );
            }
            for path in &report.written {
                println!("  {}", path.display());
            }
            println!("\nГотово!");
        }
        Commands::Synth {
            config,
            output,
            preview,
            preview_width,
        } => {
            println!("🔍 Загрузка конфигурации...");
            let params = PipelineConfig::from_toml_file(&config)?;

            println!(
                "Синтез маски (размер: {}×{}, семян: {})...",
                params.synth.width, params.synth.height, params.synth.num_seeds
            );
            let mask = MaskSynthesizer::new(&params.synth, params.extract.background).synthesize();

            println!("Сохранение в {}", output.display());
            mask.save_as_png(&output)?;
            if let Some(path) = preview {
                mask.save_preview(&path, preview_width)?;
                println!("Превью: {}", path.display());
            }

            println!("\nГотово! Маска сохранена.");
        }
    }
    Ok(())
}
