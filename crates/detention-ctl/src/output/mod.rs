//! Styled terminal output for `detention-ctl`.
//!
//! `anstream` strips the ANSI codes when stdout is not a terminal, so piped
//! output stays plain.

mod styles;

use std::io::Write;

use anstyle::Style;

use detention_shared::models::AnalysisResult;

pub(crate) use styles::clap_styles;

use styles::{action_style, DIM, ERROR, HEADER, LABEL, SUCCESS, WARNING};

fn emit(style: Style, msg: impl std::fmt::Display) {
    let mut out = anstream::stdout().lock();
    writeln!(out, "{style}{msg}{style:#}").ok();
}

pub(crate) fn success(msg: impl std::fmt::Display) {
    emit(SUCCESS, format_args!("✓ {msg}"));
}

/// Errors go to stderr
pub(crate) fn error(msg: impl std::fmt::Display) {
    let mut err = anstream::stderr().lock();
    writeln!(err, "{ERROR}✗ {msg}{ERROR:#}").ok();
}

pub(crate) fn warning(msg: impl std::fmt::Display) {
    emit(WARNING, format_args!("! {msg}"));
}

pub(crate) fn header(msg: impl std::fmt::Display) {
    emit(HEADER, msg);
}

pub(crate) fn dim(msg: impl std::fmt::Display) {
    emit(DIM, msg);
}

pub(crate) fn plain(msg: impl std::fmt::Display) {
    emit(Style::new(), msg);
}

pub(crate) fn blank() {
    plain("");
}

/// "  Label: value" with the label bolded
pub(crate) fn label(name: impl std::fmt::Display, value: impl std::fmt::Display) {
    plain(format_args!("  {LABEL}{name}:{LABEL:#} {value}"));
}

/// One analyzer verdict as a table row, colored by the recommended action
pub(crate) fn verdict_row(result: &AnalysisResult) {
    let style = action_style(result.action);
    let charge = if result.charge.is_zero() {
        "-".to_string()
    } else {
        format!("${:.2}", result.charge)
    };
    let mut out = anstream::stdout().lock();
    writeln!(
        out,
        "  {:>4}  {:<9} {:<24} {style}{:<17}{style:#} {:>10}  {DIM}{}{DIM:#}",
        result.stop_index,
        result.stop_type.to_string(),
        result.classification.to_string(),
        result.action.to_string(),
        charge,
        result.breakdown
    )
    .ok();
}
