//! Palette for terminal output and clap help.

use anstyle::{AnsiColor, Color, Effects, Style};

use detention_shared::models::DetentionAction;

const fn fg(color: AnsiColor) -> Style {
    Style::new().fg_color(Some(Color::Ansi(color)))
}

pub(crate) const SUCCESS: Style = fg(AnsiColor::Green);
pub(crate) const ERROR: Style = fg(AnsiColor::Red);
pub(crate) const WARNING: Style = fg(AnsiColor::Yellow);
pub(crate) const HEADER: Style = Style::new().effects(Effects::BOLD);
pub(crate) const LABEL: Style = Style::new().effects(Effects::BOLD);
pub(crate) const DIM: Style = Style::new().effects(Effects::DIMMED);

/// Charges in green, releases in yellow, anything waiting on a human in cyan
pub(crate) fn action_style(action: DetentionAction) -> Style {
    match action {
        DetentionAction::CreateCharge | DetentionAction::UpdateCharge => SUCCESS,
        DetentionAction::Release => WARNING,
        DetentionAction::PendingApproval | DetentionAction::PendingRetry => fg(AnsiColor::Cyan),
        DetentionAction::AnalysisOnly | DetentionAction::NoAction => DIM,
    }
}

pub(crate) fn clap_styles() -> clap::builder::Styles {
    clap::builder::Styles::styled()
        .header(fg(AnsiColor::Green).effects(Effects::BOLD))
        .usage(fg(AnsiColor::Green).effects(Effects::BOLD))
        .literal(fg(AnsiColor::Cyan))
        .placeholder(fg(AnsiColor::Cyan))
        .error(fg(AnsiColor::Red).effects(Effects::BOLD))
        .valid(fg(AnsiColor::Green))
        .invalid(fg(AnsiColor::Yellow))
}
