use indicatif::ProgressStyle;

pub fn progress_style() -> ProgressStyle {
    ProgressStyle::default_bar()
        .template("{wide_bar} {pos}/{len} | elapsed: {elapsed_precise}, eta: {eta_precise}")
        .unwrap_or_else(|_| ProgressStyle::default_bar())
}
