use clap::Parser;
use cutplan::planner::{DEFAULT_KERF, Planner};
use cutplan::render;
use cutplan::types::{PieceDemand, StockSheet};

#[derive(Parser)]
#[command(
    name = "cutplan",
    about = "Sheet cutting planner for a furniture workshop"
)]
struct Cli {
    /// Stock sheet templates as NAME:LxW (e.g. "MDF 18mm:2750x1850")
    #[arg(long = "sheet", num_args = 1.., required = true)]
    sheets: Vec<String>,

    /// Piece demands as NAME:LxW:QTY (e.g. "Side panel:700x400:2")
    #[arg(long = "piece", num_args = 1.., required = true)]
    pieces: Vec<String>,

    /// Blade kerf width in mm
    #[arg(long, default_value_t = DEFAULT_KERF)]
    kerf: f64,

    /// Show ASCII layout of each sheet
    #[arg(long)]
    layout: bool,
}

fn parse_dims(s: &str) -> Result<(f64, f64), String> {
    let (l, w) = s
        .split_once('x')
        .ok_or_else(|| format!("invalid dimensions '{s}', expected LxW"))?;
    let length: f64 = l
        .trim()
        .parse()
        .map_err(|_| format!("invalid length in '{s}'"))?;
    let width: f64 = w
        .trim()
        .parse()
        .map_err(|_| format!("invalid width in '{s}'"))?;
    if !(length > 0.0) || !(width > 0.0) {
        return Err(format!("dimensions must be positive in '{s}'"));
    }
    Ok((length, width))
}

fn parse_sheet(s: &str) -> Result<StockSheet, String> {
    let (name, dims) = s
        .rsplit_once(':')
        .ok_or_else(|| format!("invalid sheet '{s}', expected NAME:LxW"))?;
    if name.trim().is_empty() {
        return Err(format!("missing sheet name in '{s}'"));
    }
    let (length, width) = parse_dims(dims)?;
    Ok(StockSheet::new(name.trim(), length, width))
}

fn parse_piece(s: &str, index: usize) -> Result<PieceDemand, String> {
    let (rest, qty) = s
        .rsplit_once(':')
        .ok_or_else(|| format!("invalid piece '{s}', expected NAME:LxW:QTY"))?;
    let (name, dims) = rest
        .rsplit_once(':')
        .ok_or_else(|| format!("invalid piece '{s}', expected NAME:LxW:QTY"))?;
    if name.trim().is_empty() {
        return Err(format!("missing piece name in '{s}'"));
    }
    let (length, width) = parse_dims(dims)?;
    let qty: u32 = qty
        .trim()
        .parse()
        .map_err(|_| format!("invalid quantity in '{s}'"))?;
    if qty == 0 {
        return Err(format!("quantity must be non-zero in '{s}'"));
    }
    Ok(PieceDemand {
        id: format!("p{}", index + 1),
        name: name.trim().to_string(),
        length,
        width,
        qty,
    })
}

fn main() {
    let cli = Cli::parse();

    if cli.kerf < 0.0 {
        eprintln!("Error: kerf must not be negative");
        std::process::exit(1);
    }

    let stock: Vec<StockSheet> = cli
        .sheets
        .iter()
        .map(|s| parse_sheet(s))
        .collect::<Result<Vec<_>, _>>()
        .unwrap_or_else(|e| {
            eprintln!("Error: {e}");
            std::process::exit(1);
        });

    let demands: Vec<PieceDemand> = cli
        .pieces
        .iter()
        .enumerate()
        .map(|(i, s)| parse_piece(s, i))
        .collect::<Result<Vec<_>, _>>()
        .unwrap_or_else(|e| {
            eprintln!("Error: {e}");
            std::process::exit(1);
        });

    let planner = Planner::new(stock, cli.kerf);
    let plan = planner.plan(&demands).unwrap_or_else(|e| {
        eprintln!("Error: {e}");
        std::process::exit(1);
    });

    for sheet in &plan.sheets {
        println!(
            "Sheet {}: {} ({}x{}), efficiency {:.1}%",
            sheet.id,
            sheet.name,
            sheet.length,
            sheet.width,
            sheet.efficiency()
        );
        for p in &sheet.pieces {
            let rot = if p.rotated { " [rotated]" } else { "" };
            println!(
                "  {} {}x{} @ ({}, {}){}",
                p.name, p.placed_length, p.placed_width, p.x, p.y, rot
            );
        }
        if cli.layout {
            print!("{}", render::render_sheet(sheet));
        }
        println!();
    }

    println!(
        "Summary: {} sheet{} used, {:.1}% efficiency",
        plan.sheet_count(),
        if plan.sheet_count() == 1 { "" } else { "s" },
        plan.total_efficiency(),
    );
}
