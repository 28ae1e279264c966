use ratatui::{
    layout::Rect,
    style::Color,
    style::Style,
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph},
    Frame,
};

fn key_line(key: &'static str, pad: usize, desc: &'static str) -> Line<'static> {
    Line::from(vec![
        Span::raw("  "),
        Span::styled(key, Style::default().fg(Color::Magenta)),
        Span::raw(" ".repeat(pad)),
        Span::raw(desc),
    ])
}

pub fn draw_help(area: Rect, f: &mut Frame) {
    let p = Paragraph::new(vec![
        Line::from("Keybinds:"),
        Line::from(vec![
            Span::raw("  "),
            Span::styled("q", Style::default().fg(Color::Magenta)),
            Span::raw(" / "),
            Span::styled("Ctrl-C", Style::default().fg(Color::Magenta)),
            Span::raw("  Quit (the engine keeps running)"),
        ]),
        key_line("s", 11, "Start test"),
        key_line("p", 11, "Pause/Resume"),
        key_line("x", 11, "Stop test"),
        key_line("u", 11, "Send users/duration to the running test"),
        key_line("d", 11, "Download PDF report"),
        key_line("c", 11, "Clear log"),
        key_line("e", 11, "Edit run form"),
        key_line("tab", 9, "Switch tabs"),
        key_line("?", 11, "Show this help"),
        Line::from(""),
        Line::from("While editing:"),
        key_line("tab/↓", 7, "Next field"),
        key_line("S-tab/↑", 5, "Previous field"),
        key_line("enter", 7, "Done"),
        key_line("esc", 9, "Done"),
    ])
    .block(Block::default().borders(Borders::ALL).title("Help"));
    f.render_widget(p, area);
}
