use ratatui::layout::{Alignment, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::Line;
use ratatui::widgets::{Block, Clear, Paragraph, Wrap};
use ratatui::Frame;

use super::payload::{Background, TemplateSnapshot, TextAlign};
use super::state::{Phase, PresentationState};

const FALLBACK_BACKGROUND: Color = Color::Rgb(0x1e, 0x3a, 0x5f);

/// Draw a presentation state into `area`. Used by output surfaces and by the
/// preview pane of the control screen so both show the same thing.
pub fn render_presentation(frame: &mut Frame, area: Rect, state: &PresentationState) {
    frame.render_widget(Clear, area);

    if matches!(state.phase(), Phase::Blackout) {
        frame.render_widget(Block::default().style(Style::default().bg(Color::Black)), area);
        return;
    }

    let (background, foreground) = template_colors(state.template().map(|t| t.as_ref()));
    frame.render_widget(Block::default().style(Style::default().bg(background)), area);

    let Some(text) = state.text() else {
        return;
    };

    let lines: Vec<Line> = text.lines().map(Line::from).collect();
    let rows = wrapped_rows(text, area.width).min(usize::from(area.height)) as u16;
    let top = (area.height - rows) / 2;
    let text_area = Rect {
        y: area.y + top,
        height: area.height - top,
        ..area
    };

    let alignment = match state.template().map(|t| t.text_align).unwrap_or_default() {
        TextAlign::Left => Alignment::Left,
        TextAlign::Center => Alignment::Center,
        TextAlign::Right => Alignment::Right,
    };
    let paragraph = Paragraph::new(lines)
        .alignment(alignment)
        .wrap(Wrap { trim: true })
        .style(
            Style::default()
                .fg(foreground)
                .bg(background)
                .add_modifier(Modifier::BOLD),
        );
    frame.render_widget(paragraph, text_area);
}

/// Rows `text` takes once word-wrapped to `width`. Words longer than a row
/// are split across rows.
fn wrapped_rows(text: &str, width: u16) -> usize {
    let width = usize::from(width.max(1));
    text.lines()
        .map(|line| {
            let mut rows = 1;
            let mut column = 0;
            for word in line.split_whitespace() {
                let len = word.chars().count();
                if column == 0 {
                    column = len;
                } else if column + 1 + len <= width {
                    column += 1 + len;
                } else {
                    rows += 1;
                    column = len;
                }
                while column > width {
                    rows += 1;
                    column -= width;
                }
            }
            rows
        })
        .sum()
}

/// Terminal colors approximating a template: the first hex stop of a gradient
/// (or black behind embedded media) and the font color.
pub fn template_colors(template: Option<&TemplateSnapshot>) -> (Color, Color) {
    let Some(template) = template else {
        return (FALLBACK_BACKGROUND, Color::White);
    };
    let background = match &template.background {
        Background::Gradient(value) => first_hex_color(value).unwrap_or(FALLBACK_BACKGROUND),
        Background::Image { .. } | Background::Video { .. } => Color::Black,
    };
    let foreground = parse_hex(&template.font_color).unwrap_or(Color::White);
    (background, foreground)
}

fn first_hex_color(value: &str) -> Option<Color> {
    value.match_indices('#').find_map(|(idx, _)| {
        let digits: String = value[idx + 1..]
            .chars()
            .take_while(|c| c.is_ascii_hexdigit())
            .collect();
        parse_hex(&format!("#{digits}"))
    })
}

fn parse_hex(raw: &str) -> Option<Color> {
    let hex = raw.trim().strip_prefix('#')?;
    if !hex.is_ascii() {
        return None;
    }
    let channel = |s: &str| u8::from_str_radix(s, 16).ok();
    match hex.len() {
        6 => Some(Color::Rgb(
            channel(&hex[0..2])?,
            channel(&hex[2..4])?,
            channel(&hex[4..6])?,
        )),
        3 => {
            let expand = |i: usize| channel(&hex[i..i + 1]).map(|v| v * 17);
            Some(Color::Rgb(expand(0)?, expand(1)?, expand(2)?))
        }
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::presentation::PresentationPayload;
    use ratatui::backend::TestBackend;
    use ratatui::Terminal;
    use std::sync::Arc;

    fn snapshot() -> Arc<TemplateSnapshot> {
        Arc::new(TemplateSnapshot {
            template_id: 1,
            name: "Sunset".to_string(),
            background: Background::Gradient(
                "linear-gradient(135deg, #f093fb 0%, #f5576c 100%)".to_string(),
            ),
            font_family: "Inter".to_string(),
            font_size: 72,
            font_color: "#fff".to_string(),
            text_align: TextAlign::Center,
            text_shadow: String::new(),
        })
    }

    fn buffer_text(terminal: &Terminal<TestBackend>) -> String {
        let buffer = terminal.backend().buffer();
        buffer.content.iter().map(|cell| cell.symbol()).collect()
    }

    #[test]
    fn gradient_uses_first_stop() {
        let (bg, fg) = template_colors(Some(&snapshot()));
        assert_eq!(bg, Color::Rgb(0xf0, 0x93, 0xfb));
        assert_eq!(fg, Color::Rgb(255, 255, 255));
    }

    #[test]
    fn missing_template_falls_back() {
        assert_eq!(template_colors(None), (FALLBACK_BACKGROUND, Color::White));
    }

    #[test]
    fn wrapped_rows_follow_the_width() {
        assert_eq!(wrapped_rows("Amazing grace", 40), 1);
        assert_eq!(wrapped_rows("Amazing grace", 10), 2);
        assert_eq!(wrapped_rows("one\ntwo\n\nthree", 40), 4);
        assert_eq!(wrapped_rows("abcdefghij", 4), 3);
    }

    #[test]
    fn long_verse_wraps_without_losing_its_tail() {
        let verse = "For God so loved the world, that he gave his only begotten Son, \
                     that whosoever believeth in him should not perish, but have everlasting life.";
        let mut terminal = Terminal::new(TestBackend::new(80, 24)).unwrap();
        let mut state = PresentationState::new();
        state.apply(PresentationPayload::present(verse, Some(snapshot())));
        terminal
            .draw(|frame| {
                let area = frame.area();
                render_presentation(frame, area, &state)
            })
            .unwrap();

        let text = buffer_text(&terminal);
        assert!(text.contains("For God"));
        assert!(text.contains("everlasting"));
    }

    #[test]
    fn renders_text_then_blackout_hides_it() {
        let mut terminal = Terminal::new(TestBackend::new(40, 8)).unwrap();
        let mut state = PresentationState::new();
        state.apply(PresentationPayload::present("Amazing grace", Some(snapshot())));
        terminal
            .draw(|frame| {
                let area = frame.area();
                render_presentation(frame, area, &state)
            })
            .unwrap();
        assert!(buffer_text(&terminal).contains("Amazing grace"));

        state.apply(PresentationPayload::blackout());
        terminal
            .draw(|frame| {
                let area = frame.area();
                render_presentation(frame, area, &state)
            })
            .unwrap();
        assert!(!buffer_text(&terminal).contains("Amazing"));
    }
}
