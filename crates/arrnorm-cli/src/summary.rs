use std::path::Path;

use console::Style;

use arrnorm_core::mask::MaskBackend;
use arrnorm_core::pipeline::{NormalizeConfig, NormalizedImage, RegisterConfig, RegisterOutput};

struct Styles {
    title: Style,
    header: Style,
    label: Style,
    value: Style,
    disabled: Style,
    path: Style,
    done: Style,
}

impl Styles {
    fn new() -> Self {
        Self {
            title: Style::new().cyan().bold(),
            header: Style::new().cyan().bold(),
            label: Style::new().dim(),
            value: Style::new().bold().white(),
            disabled: Style::new().dim().yellow(),
            path: Style::new().underlined(),
            done: Style::new().green().bold(),
        }
    }
}

const RULE: &str = "════════════════════════════════════════";

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

/// Banner printed once before a normalization batch.
pub fn print_normalize_summary(title: &str, config: &NormalizeConfig) {
    let s = Styles::new();

    println!();
    println!("  {}", s.title.apply_to(RULE));
    println!("  {}", s.title.apply_to(title));
    println!("  {}", s.title.apply_to(RULE));
    println!();

    println!(
        "  {:<14}{}",
        s.label.apply_to("Reference"),
        s.path.apply_to(config.reference.display())
    );
    println!(
        "  {:<14}{}",
        s.label.apply_to("Images"),
        s.value.apply_to(config.images.len())
    );
    println!(
        "  {:<14}{}",
        s.label.apply_to("Iterations"),
        s.value.apply_to(config.iterations)
    );
    println!(
        "  {:<14}{}",
        s.label.apply_to("Threshold"),
        s.value.apply_to(config.threshold)
    );

    if config.register {
        println!("  {:<14}{}", s.label.apply_to("Register"), s.value.apply_to("yes"));
    }

    if config.mask {
        let backend = match &config.mask_backend {
            MaskBackend::Native => "native".to_string(),
            MaskBackend::External { program } => program.clone(),
        };
        println!("  {:<14}{}", s.label.apply_to("Mask"), s.value.apply_to(backend));
    } else {
        println!("  {:<14}{}", s.label.apply_to("Mask"), s.disabled.apply_to("disabled"));
    }
    println!();
}

/// Per-image header, `PROCESSING IMAGE: name (i/n)`.
pub fn print_image_header(index: usize, total: usize, target: &Path) {
    let s = Styles::new();
    println!();
    println!(
        "  {} {} ({}/{})",
        s.header.apply_to("PROCESSING IMAGE:"),
        s.value.apply_to(file_name(target)),
        index + 1,
        total
    );
}

pub fn print_image_done(result: &NormalizedImage) {
    let s = Styles::new();
    println!(
        "  {} normalization finished for {}",
        s.done.apply_to("DONE:"),
        s.value.apply_to(file_name(&result.target))
    );
    println!(
        "    {:<12}{}",
        s.label.apply_to("Normalized"),
        s.path.apply_to(result.normalized.display())
    );
    if let Some(mask) = &result.mask {
        println!("    {:<12}{}", s.label.apply_to("Mask"), s.path.apply_to(mask.display()));
    }
}

/// Banner printed before registration: start time, inputs and warp band.
pub fn print_register_summary(config: &RegisterConfig, started: &str) {
    let s = Styles::new();

    println!();
    println!("  {}", s.title.apply_to(RULE));
    println!("  {}", s.title.apply_to("Image registration"));
    println!("  {}", s.title.apply_to(RULE));
    println!("  {:<14}{}", s.label.apply_to("Started"), s.value.apply_to(started));
    println!(
        "  {:<14}{}",
        s.label.apply_to("Reference"),
        s.path.apply_to(config.reference.display())
    );
    println!(
        "  {:<14}{}",
        s.label.apply_to("Target"),
        s.path.apply_to(config.target.display())
    );
    println!(
        "  {:<14}{}",
        s.label.apply_to("Warp band"),
        s.value.apply_to(config.warp_band)
    );
    match config.window {
        Some(w) => println!("  {:<14}{}", s.label.apply_to("Window"), s.value.apply_to(w)),
        None => println!(
            "  {:<14}{}",
            s.label.apply_to("Window"),
            s.disabled.apply_to("full reference")
        ),
    }
    println!();
}

pub fn print_register_result(out: &RegisterOutput) {
    let s = Styles::new();
    println!(
        "  {:<14}{}",
        s.label.apply_to("Transform"),
        s.value.apply_to(out.transform)
    );
    println!(
        "  {:<14}{}",
        s.label.apply_to("Warped image"),
        s.path.apply_to(out.path.display())
    );
    println!(
        "  {:<14}{}",
        s.label.apply_to("Elapsed"),
        s.value.apply_to(format!("{:.2} s", out.elapsed.as_secs_f64()))
    );
    if out.saturated > 0 {
        println!(
            "  {:<14}{}",
            s.label.apply_to("Saturated"),
            s.disabled.apply_to(format!("{} pixels clamped", out.saturated))
        );
    }
    println!();
}
