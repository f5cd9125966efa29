//! `weighlabel`: price, look up and export weighed-goods labels.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Context};
use clap::{Parser, Subcommand, ValueEnum};
use weighlabel::host::data_url;
use weighlabel::{
    AppConfig, BarcodeChoices, BarcodeGraphic, BarcodeOptions, DirDownloader, LabelCompositor, LabelFont, LabelForm,
    LookupClient, RenderHost, Symbology, VectorBarcodeRenderer,
};

#[derive(Parser, Debug)]
#[command(name = "weighlabel", about = "Weighed-goods label generator")]
struct Cli {
    /// Path to config file (default: ./weighlabel.toml).
    #[arg(long = "config", global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Print the price for a unit price and weight.
    Price {
        unit_price: String,
        weight: String,
    },

    /// List candidate barcodes for a product code.
    Lookup {
        product_code: String,
    },

    /// Show the label rows as they will be printed.
    Preview {
        #[arg(long)]
        unit_price: Option<String>,
        #[arg(long)]
        weight: Option<String>,
    },

    /// Print the barcode graphic as an SVG data URL.
    Barcode {
        value: String,
        #[arg(long, value_enum, default_value = "code128")]
        symbology: SymbologyArg,
    },

    /// Compose the label and save `barcode-<value>.png`.
    Export {
        #[arg(long)]
        unit_price: String,
        #[arg(long)]
        weight: String,
        /// Barcode value; with --product-code, picks among the looked-up candidates.
        #[arg(long)]
        barcode: Option<String>,
        /// Look up the barcode by product code (first candidate unless --barcode matches one).
        #[arg(long)]
        product_code: Option<String>,
        #[arg(long, value_enum, default_value = "code128")]
        symbology: SymbologyArg,
        /// Output directory (overrides config).
        #[arg(long, short = 'o')]
        out: Option<PathBuf>,
    },
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum SymbologyArg {
    Code128,
    Ean13,
}

impl From<SymbologyArg> for Symbology {
    fn from(s: SymbologyArg) -> Self {
        match s {
            SymbologyArg::Code128 => Symbology::Code128,
            SymbologyArg::Ean13 => Symbology::Ean13,
        }
    }
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env().add_directive(tracing::Level::INFO.into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config_path = cli.config.unwrap_or_else(|| PathBuf::from(AppConfig::FILE_NAME));
    let config = AppConfig::load(&config_path)?;

    // one event loop, like the page it replaces
    let rt = tokio::runtime::Builder::new_current_thread().enable_all().build()?;
    rt.block_on(run(cli.command, config))
}

async fn run(command: Commands, config: AppConfig) -> anyhow::Result<()> {
    match command {
        Commands::Price { unit_price, weight } => {
            let mut form = LabelForm::default();
            form.set_unit_price(&unit_price);
            form.set_weight(&weight);
            if form.fields().price.is_empty() {
                bail!("unit price and weight must both be numbers");
            }
            println!("{}", form.fields().price);
        }

        Commands::Lookup { product_code } => {
            let client = LookupClient::new(&config.lookup.base_url, config.lookup.timeout())?;
            let mut choices = BarcodeChoices::default();
            choices.refresh(&client, &product_code).await;
            if let Some(msg) = choices.message() {
                println!("{msg}");
            }
            for opt in choices.options() {
                match opt.amount {
                    Some(amount) => println!("{}\t{}\t{}", opt.id, opt.value, amount),
                    None => println!("{}\t{}", opt.id, opt.value),
                }
            }
        }

        Commands::Preview { unit_price, weight } => {
            let mut form = LabelForm::default();
            form.set_unit_price(unit_price.as_deref().unwrap_or_default());
            form.set_weight(weight.as_deref().unwrap_or_default());
            let [unit, weight, price] = form.fields().preview_row();
            println!("{:<14}{:^14}{:>14}", "Unit Price", "Weight", "Price");
            println!("{:<14}{:^14}{:>14}", unit, weight, price);
        }

        Commands::Barcode { value, symbology } => {
            let opts = BarcodeOptions { symbology: symbology.into(), ..Default::default() };
            let graphic = BarcodeGraphic::encode(&value, &opts)
                .with_context(|| format!("{value:?} cannot be encoded as {symbology:?}"))?;
            println!("{}", data_url("image/svg+xml", graphic.to_svg().as_bytes()));
        }

        Commands::Export { unit_price, weight, barcode, product_code, symbology, out } => {
            let mut form = LabelForm::default();
            form.set_unit_price(&unit_price);
            form.set_weight(&weight);
            if let Some(value) = &barcode {
                form.set_barcode_value(value);
            }

            if let Some(code) = product_code {
                let client = LookupClient::new(&config.lookup.base_url, config.lookup.timeout())?;
                let mut choices = BarcodeChoices::default();
                choices.refresh(&client, &code).await;
                if let Some(msg) = choices.message() {
                    bail!("{msg}");
                }
                let picked = choices
                    .options()
                    .iter()
                    .find(|o| barcode.as_deref() == Some(o.value.as_str()))
                    .or_else(|| choices.options().first())
                    .with_context(|| format!("no barcodes listed for {code}"))?;
                form.select_option(picked);
            }

            let fields = form.into_fields();
            if let Some(missing) = fields.missing_field() {
                return Err(weighlabel::Error::Incomplete(missing).into());
            }

            let mut compositor = LabelCompositor::new(VectorBarcodeRenderer, RenderHost::new())
                .with_scale(config.label.scale)
                .with_render_timeout(config.label.render_timeout())
                .with_barcode_options(BarcodeOptions { symbology: symbology.into(), ..Default::default() });
            if let Some(path) = &config.label.font_path {
                compositor = compositor.with_font(Arc::new(LabelFont::from_path(path)?));
            }

            let downloader = DirDownloader::new(out.unwrap_or(config.output_dir));
            let report = compositor.export(&fields, &downloader).await?;
            if let weighlabel::Composition::Degraded(reason) = &report.outcome {
                eprintln!("warning: label saved without barcode ({reason})");
            }
            println!("{}", report.path.display());
        }
    }
    Ok(())
}
