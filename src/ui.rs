use crate::app::{InputMode, InputState};
use crate::core::{DropCore, Tab};
use crate::format::{format_file_size, format_time, progress_bar};
use crate::player::PlayerState;
use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, List, ListItem, ListState, Paragraph, Wrap};

const APP_TITLE_WITH_VERSION: &str = "TuneDrop v0.1.0  ";

struct Palette {
    bg: Color,
    panel_bg: Color,
    panel_alt_bg: Color,
    border: Color,
    text: Color,
    muted: Color,
    accent: Color,
    alert: Color,
    selected_bg: Color,
}

const COLORS: Palette = Palette {
    bg: Color::Rgb(10, 15, 24),
    panel_bg: Color::Rgb(19, 29, 43),
    panel_alt_bg: Color::Rgb(24, 38, 58),
    border: Color::Rgb(69, 121, 176),
    text: Color::Rgb(214, 228, 248),
    muted: Color::Rgb(149, 173, 204),
    accent: Color::Rgb(100, 203, 184),
    alert: Color::Rgb(249, 174, 88),
    selected_bg: Color::Rgb(34, 55, 82),
};

pub fn draw(
    frame: &mut Frame,
    core: &DropCore,
    player: &PlayerState,
    volume: f32,
    input: &InputState,
) {
    frame.render_widget(
        Block::default().style(Style::default().bg(COLORS.bg)),
        frame.area(),
    );

    let vertical = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Min(8),
            Constraint::Length(3),
            Constraint::Length(3),
        ])
        .split(frame.area());

    draw_header(frame, core, vertical[0]);

    match core.tab {
        Tab::Home => draw_home(frame, core, input, vertical[1]),
        Tab::Downloads => draw_downloads(frame, core, player, vertical[1]),
        Tab::Player => draw_player(frame, player, vertical[1]),
        Tab::Playlists => draw_playlists(frame, core, vertical[1]),
        Tab::Settings => draw_settings(frame, core, volume, vertical[1]),
    }

    let timeline = Paragraph::new(Span::styled(
        timeline_line(player, volume, 26, 14),
        Style::default().fg(COLORS.text),
    ))
    .block(panel_block("Timeline", COLORS.panel_bg))
    .wrap(Wrap { trim: true });
    frame.render_widget(timeline, vertical[2]);

    frame.render_widget(footer(core, input), vertical[3]);
}

fn draw_header(frame: &mut Frame, core: &DropCore, area: Rect) {
    frame.render_widget(panel_block("Status", COLORS.panel_bg), area);
    let inner = area.inner(Margin {
        vertical: 1,
        horizontal: 1,
    });
    let chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(40), Constraint::Percentage(60)])
        .split(inner);

    let left = Paragraph::new(Line::from(vec![
        Span::styled(
            APP_TITLE_WITH_VERSION,
            Style::default()
                .fg(COLORS.accent)
                .add_modifier(Modifier::BOLD),
        ),
        Span::styled(
            format!("Files {}", core.files.len()),
            Style::default().fg(COLORS.text),
        ),
    ]));
    frame.render_widget(left, chunks[0]);

    let right = Paragraph::new(tab_line(core.tab)).alignment(Alignment::Right);
    frame.render_widget(right, chunks[1]);
}

fn tab_line(selected: Tab) -> Line<'static> {
    let mut spans = Vec::new();
    for (idx, tab) in Tab::ALL.into_iter().enumerate() {
        if idx > 0 {
            spans.push(Span::styled(" -- ", Style::default().fg(COLORS.muted)));
        }
        let mut style = Style::default().fg(COLORS.accent);
        if tab == selected {
            style = style.add_modifier(Modifier::BOLD | Modifier::UNDERLINED);
        }
        spans.push(Span::styled(format!("{} {}", idx + 1, tab.label()), style));
    }
    Line::from(spans)
}

fn split_body(area: Rect) -> std::rc::Rc<[Rect]> {
    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(66), Constraint::Percentage(34)])
        .split(area)
}

fn draw_home(frame: &mut Frame, core: &DropCore, input: &InputState, area: Rect) {
    let body = split_body(area);

    let editing = input.mode == InputMode::Url;
    let field_style = if editing {
        Style::default().fg(COLORS.alert)
    } else {
        Style::default().fg(COLORS.text)
    };
    let cursor = if editing { "_" } else { "" };

    let download_line = match (&core.download.filename, core.download.percent) {
        (Some(name), _) if core.download.converting => format!("{name}  converting to MP3..."),
        (Some(name), Some(percent)) => format!(
            "{name}  {} {percent}%",
            progress_bar(Some(f64::from(percent) / 100.0), 20)
        ),
        (Some(name), None) => name.clone(),
        (None, _) => "idle".to_string(),
    };

    let lines = vec![
        Line::from(vec![
            Span::styled(
                "URL",
                Style::default()
                    .fg(COLORS.accent)
                    .add_modifier(Modifier::BOLD),
            ),
            Span::styled(format!("  {}{cursor}", core.url_input), field_style),
        ]),
        Line::from(Span::styled(
            "i edit, Enter download",
            Style::default().fg(COLORS.muted),
        )),
        Line::from(""),
        Line::from(vec![
            Span::styled("Copied  ", Style::default().fg(COLORS.accent)),
            Span::styled(
                core.pending_url.as_deref().unwrap_or("-").to_string(),
                Style::default().fg(COLORS.text),
            ),
        ]),
        Line::from(vec![
            Span::styled("Download  ", Style::default().fg(COLORS.accent)),
            Span::styled(download_line, Style::default().fg(COLORS.alert)),
        ]),
        Line::from(Span::styled(
            core.floating.status_text(),
            Style::default().fg(COLORS.muted),
        )),
    ];
    let home = Paragraph::new(lines)
        .block(panel_block("Download", COLORS.panel_bg))
        .wrap(Wrap { trim: true });
    frame.render_widget(home, body[0]);

    let toasts: Vec<ListItem> = core
        .recent_toasts
        .iter()
        .map(|toast| ListItem::new(Span::styled(toast.as_str(), Style::default().fg(COLORS.text))))
        .collect();
    frame.render_widget(
        List::new(toasts).block(panel_block("Recent", COLORS.panel_alt_bg)),
        body[1],
    );
}

fn draw_downloads(frame: &mut Frame, core: &DropCore, player: &PlayerState, area: Rect) {
    let body = split_body(area);
    let playing = player.current.as_ref().map(|entry| entry.path.as_path());

    let items: Vec<ListItem> = core
        .files
        .iter()
        .map(|file| {
            let marker = if playing == Some(file.path.as_path()) {
                "  > "
            } else {
                "    "
            };
            ListItem::new(Line::from(vec![
                Span::styled(marker, Style::default().fg(COLORS.muted)),
                Span::styled(file.file_name.as_str(), Style::default().fg(COLORS.text)),
            ]))
        })
        .collect();

    let mut state = ListState::default();
    state.select((!core.files.is_empty()).then_some(core.selected_file));
    let title = format!("Downloads / {}", core.download_dir.display());
    frame.render_stateful_widget(selectable_list(items, &title), body[0], &mut state);

    let info = match core.selected_file() {
        Some(file) => vec![
            Line::from(vec![
                Span::styled(
                    "Title",
                    Style::default()
                        .fg(COLORS.accent)
                        .add_modifier(Modifier::BOLD),
                ),
                Span::styled(format!("  {}", file.title), Style::default().fg(COLORS.text)),
            ]),
            Line::from(Span::styled(
                format!("Artist  {}", file.artist),
                Style::default().fg(COLORS.muted),
            )),
            Line::from(Span::styled(
                format!("Size    {}", format_file_size(file.size_bytes)),
                Style::default().fg(COLORS.muted),
            )),
            Line::from(Span::styled(
                format!("Type    {}", file.extension.to_uppercase()),
                Style::default().fg(COLORS.muted),
            )),
            Line::from(Span::styled(
                format!(
                    "Length  {}",
                    file.duration_ms.map(format_time).unwrap_or_else(|| "-".to_string())
                ),
                Style::default().fg(COLORS.alert),
            )),
        ],
        None => vec![Line::from(Span::styled(
            "No downloads yet",
            Style::default().fg(COLORS.muted),
        ))],
    };
    let info = Paragraph::new(info)
        .block(panel_block("File Info", COLORS.panel_alt_bg))
        .wrap(Wrap { trim: true });
    frame.render_widget(info, body[1]);
}

fn draw_player(frame: &mut Frame, player: &PlayerState, area: Rect) {
    let (title, artist) = player
        .current
        .as_ref()
        .map(|entry| (entry.title.as_str(), entry.artist.as_str()))
        .unwrap_or(("No song selected", "-"));
    let queue = match player.queue_index {
        Some(index) => format!("{}/{}", index + 1, player.queue_len),
        None => format!("-/{}", player.queue_len),
    };
    let on_off = |flag: bool| if flag { "on" } else { "off" };

    let lines = vec![
        Line::from(vec![
            Span::styled(
                "Now",
                Style::default()
                    .fg(COLORS.accent)
                    .add_modifier(Modifier::BOLD),
            ),
            Span::styled(format!("  {title}"), Style::default().fg(COLORS.text)),
        ]),
        Line::from(Span::styled(
            format!("Artist   {artist}"),
            Style::default().fg(COLORS.muted),
        )),
        Line::from(Span::styled(
            format!("Queue    {queue}"),
            Style::default().fg(COLORS.alert),
        )),
        Line::from(Span::styled(
            format!(
                "State    {}",
                if player.is_playing { "playing" } else { "paused" }
            ),
            Style::default().fg(COLORS.muted),
        )),
        Line::from(Span::styled(
            format!(
                "Shuffle  {}   Repeat  {}",
                on_off(player.shuffle),
                on_off(player.repeat)
            ),
            Style::default().fg(COLORS.muted),
        )),
        Line::from(""),
        Line::from(Span::styled(
            "space play/pause  n next  b previous  s shuffle  r repeat  x stop  d dismiss  <-/-> seek",
            Style::default().fg(COLORS.muted),
        )),
    ];
    let panel = Paragraph::new(lines)
        .block(panel_block("Now Playing", COLORS.panel_bg))
        .wrap(Wrap { trim: true });
    frame.render_widget(panel, area);
}

fn draw_playlists(frame: &mut Frame, core: &DropCore, area: Rect) {
    let body = split_body(area);
    let summaries = core.playlist_summaries();

    let items: Vec<ListItem> = summaries
        .iter()
        .map(|summary| {
            ListItem::new(Line::from(vec![
                Span::styled(format!("{:>3}  ", summary.id), Style::default().fg(COLORS.muted)),
                Span::styled(summary.name.clone(), Style::default().fg(COLORS.text)),
                Span::styled(
                    format!("  ({})", summary.song_count),
                    Style::default().fg(COLORS.alert),
                ),
            ]))
        })
        .collect();
    let mut state = ListState::default();
    state.select((!summaries.is_empty()).then_some(core.selected_playlist));
    frame.render_stateful_widget(selectable_list(items, "Playlists"), body[0], &mut state);

    let songs: Vec<ListItem> = core
        .playlist_songs
        .iter()
        .map(|song| {
            ListItem::new(Line::from(vec![
                Span::styled(
                    format!("{:>3}. ", song.play_order),
                    Style::default().fg(COLORS.muted),
                ),
                Span::styled(song.title.clone(), Style::default().fg(COLORS.text)),
            ]))
        })
        .collect();
    frame.render_widget(
        List::new(songs).block(panel_block("Songs", COLORS.panel_alt_bg)),
        body[1],
    );
}

fn draw_settings(frame: &mut Frame, core: &DropCore, volume: f32, area: Rect) {
    let tools = &core.settings.tools;
    let row = |label: &str, value: String| {
        Line::from(vec![
            Span::styled(format!("{label:<14}"), Style::default().fg(COLORS.accent)),
            Span::styled(value, Style::default().fg(COLORS.text)),
        ])
    };
    let lines = vec![
        row("Download dir", core.download_dir.display().to_string()),
        row("Share target", core.settings.share_target_label.clone()),
        row("Floating", core.floating.status_text().to_string()),
        row("Volume", format!("{}%", (volume * 100.0).round() as u16)),
        row("yt-dlp", tools.yt_dlp.clone()),
        row("ffmpeg", tools.ffmpeg.clone()),
        row("adb", tools.adb.clone()),
        row(
            "adb serial",
            tools.adb_serial.clone().unwrap_or_else(|| "-".to_string()),
        ),
        row(
            "Helper script",
            tools
                .helper_script
                .as_ref()
                .map(|path| path.display().to_string())
                .unwrap_or_else(|| "-".to_string()),
        ),
    ];
    let panel = Paragraph::new(lines)
        .block(panel_block("Settings", COLORS.panel_bg))
        .wrap(Wrap { trim: true });
    frame.render_widget(panel, area);
}

fn footer<'a>(core: &'a DropCore, input: &'a InputState) -> Paragraph<'a> {
    let line = if input.mode == InputMode::Command {
        Line::from(vec![
            Span::styled(":", Style::default().fg(COLORS.alert)),
            Span::styled(input.command.as_str(), Style::default().fg(COLORS.text)),
            Span::styled("_", Style::default().fg(COLORS.alert)),
        ])
    } else {
        Line::from(vec![
            Span::styled(
                "Keys: Tab switch, Enter play, g share, u browser URL, p get copied link, : command, q quit",
                Style::default().fg(COLORS.muted),
            ),
            Span::styled("  |  ", Style::default().fg(COLORS.muted)),
            Span::styled(core.status.as_str(), Style::default().fg(COLORS.text)),
        ])
    };
    Paragraph::new(line).block(panel_block("Message", COLORS.panel_bg))
}

fn selectable_list<'a>(items: Vec<ListItem<'a>>, title: &str) -> List<'a> {
    List::new(items)
        .block(panel_block(title, COLORS.panel_bg))
        .highlight_style(
            Style::default()
                .bg(COLORS.selected_bg)
                .fg(Color::White)
                .add_modifier(Modifier::BOLD),
        )
        .highlight_symbol("-> ")
}

fn panel_block(title: &str, bg: Color) -> Block<'static> {
    Block::default()
        .borders(Borders::ALL)
        .title(Span::styled(
            format!(" {title} "),
            Style::default().fg(COLORS.text).add_modifier(Modifier::BOLD),
        ))
        .border_style(Style::default().fg(COLORS.border))
        .style(Style::default().bg(bg))
}

fn timeline_line(
    player: &PlayerState,
    volume: f32,
    timeline_bar_width: usize,
    volume_bar_width: usize,
) -> String {
    let ratio = (player.duration_ms > 0)
        .then(|| player.position_ms as f64 / player.duration_ms as f64);
    let total = if player.duration_ms > 0 {
        format_time(player.duration_ms)
    } else {
        String::from("-:--")
    };

    format!(
        "{} / {} {}  |  Vol {} {:>3}%  +/- adjust",
        format_time(player.position_ms),
        total,
        progress_bar(ratio, timeline_bar_width),
        progress_bar(Some(f64::from(volume.clamp(0.0, 1.0))), volume_bar_width),
        (volume * 100.0).round() as u16
    )
}
