use crate::app::App;
use crate::braille::BrailleCanvas;
use crate::map::{MapLayers, MapRenderer};
use ratatui::{
    buffer::Buffer,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, List, ListItem, Paragraph, Row, Table, Widget, Wrap},
    Frame,
};

/// Width of the selected-countries panel right of the map
const SIDE_PANEL_WIDTH: u16 = 36;

/// Inner character size of the map for a terminal of `width x height`
pub fn map_inner_size(width: u16, height: u16) -> (u16, u16) {
    // Map border takes 2 each way, the status bar 1 row
    (
        width.saturating_sub(SIDE_PANEL_WIDTH + 2),
        height.saturating_sub(3),
    )
}

/// Render the UI
pub fn render(frame: &mut Frame, app: &App) {
    let area = frame.area();

    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(3), Constraint::Length(1)])
        .split(area);
    let columns = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Min(10), Constraint::Length(SIDE_PANEL_WIDTH)])
        .split(rows[0]);

    render_map(frame, app, columns[0]);
    render_selection(frame, app, columns[1]);
    render_status_bar(frame, app, rows[1]);

    if app.dashboard.is_dialog_open() {
        render_dialog(frame, app, area);
    }
    // Alerts sit above everything, including the dialog
    if let Some(message) = app.dashboard.front_alert() {
        render_alert(frame, message, app.dashboard.pending_alerts(), area);
    }
}

fn render_map(frame: &mut Frame, app: &App, area: Rect) {
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::DarkGray))
        .title(Span::styled(
            " World Map ",
            Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
        ));

    let inner = block.inner(area);
    frame.render_widget(block, area);

    let mut viewport = app.viewport.clone();
    viewport.width = inner.width as usize * 2;
    viewport.height = inner.height as usize * 4;

    let highlights = app.highlights();
    let layers = MapRenderer::new(&app.atlas.shapes).render(
        inner.width as usize,
        inner.height as usize,
        &viewport,
        |index| highlights[index],
    );

    let cursor_pos = app.mouse_pixel_pos().and_then(|(px, py)| {
        let (cx, cy) = ((px / 2) as u16, (py / 4) as u16);
        (cx < inner.width && cy < inner.height).then_some((cx, cy))
    });

    frame.render_widget(MapWidget { layers, cursor_pos }, inner);
}

/// Braille map layers with the mouse marker on top
struct MapWidget {
    layers: MapLayers,
    cursor_pos: Option<(u16, u16)>,
}

impl MapWidget {
    fn render_layer(canvas: &BrailleCanvas, color: Color, area: Rect, buf: &mut Buffer) {
        for (col, row, ch) in canvas.cells() {
            if col >= area.width as usize || row >= area.height as usize {
                continue;
            }
            let (x, y) = (area.x + col as u16, area.y + row as u16);
            buf[(x, y)].set_char(ch).set_fg(color);
        }
    }
}

impl Widget for MapWidget {
    fn render(self, area: Rect, buf: &mut Buffer) {
        Self::render_layer(&self.layers.outlines, Color::Cyan, area, buf);
        Self::render_layer(&self.layers.selected, Color::Yellow, area, buf);
        Self::render_layer(&self.layers.cursor, Color::Magenta, area, buf);

        if let Some((cx, cy)) = self.cursor_pos {
            let (x, y) = (area.x + cx, area.y + cy);
            if x < area.x + area.width && y < area.y + area.height {
                buf[(x, y)].set_char('╋').set_fg(Color::Red);
            }
        }
    }
}

fn render_selection(frame: &mut Frame, app: &App, area: Rect) {
    let items: Vec<ListItem> = app
        .dashboard
        .display_items()
        .iter()
        .map(|item| ListItem::new(item.name.as_str()))
        .collect();

    let title = format!(" Selected ({}) ", items.len());
    let list = List::new(items).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::DarkGray))
            .title(Span::styled(title, Style::default().fg(Color::Yellow))),
    );
    frame.render_widget(list, area);
}

fn render_dialog(frame: &mut Frame, app: &App, area: Rect) {
    let popup = centered(area, 70, 60);
    frame.render_widget(Clear, popup);

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Cyan))
        .title(Span::styled(
            format!(" {} ", app.dashboard.title()),
            Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
        ))
        .title_bottom(Line::from(" Esc: close ").right_aligned());

    let records = app.dashboard.records();
    if records.is_empty() {
        let waiting = Paragraph::new("Waiting for answers...")
            .style(Style::default().fg(Color::DarkGray))
            .block(block);
        frame.render_widget(waiting, popup);
        return;
    }

    let rows = records.iter().map(|record| {
        Row::new(vec![
            record.name.clone(),
            record.code.clone(),
            group_digits(record.population),
        ])
    });
    let table = Table::new(
        rows,
        [Constraint::Min(20), Constraint::Length(6), Constraint::Length(15)],
    )
    .header(
        Row::new(vec!["Name", "Code", "Population"])
            .style(Style::default().add_modifier(Modifier::BOLD)),
    )
    .block(block);
    frame.render_widget(table, popup);
}

fn render_alert(frame: &mut Frame, message: &str, pending: usize, area: Rect) {
    let popup = centered(area, 50, 25);
    frame.render_widget(Clear, popup);

    let hint = if pending > 1 {
        format!(" Enter: dismiss ({} more) ", pending - 1)
    } else {
        " Enter: dismiss ".to_string()
    };
    let alert = Paragraph::new(message)
        .wrap(Wrap { trim: true })
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(Color::Red))
                .title(Span::styled(
                    " Error ",
                    Style::default().fg(Color::Red).add_modifier(Modifier::BOLD),
                ))
                .title_bottom(Line::from(hint).right_aligned()),
        );
    frame.render_widget(alert, popup);
}

fn render_status_bar(frame: &mut Frame, app: &App, area: Rect) {
    let region = app
        .cursor_region_info()
        .map(|r| format!("{} ({}) ", r.name, r.location_code))
        .unwrap_or_default();

    let status = Line::from(vec![
        Span::styled(" Zoom: ", Style::default().fg(Color::DarkGray)),
        Span::styled(app.zoom_level(), Style::default().fg(Color::Yellow)),
        Span::styled(" | ", Style::default().fg(Color::DarkGray)),
        Span::styled(app.center_coords(), Style::default().fg(Color::Cyan)),
        Span::styled(" | ", Style::default().fg(Color::DarkGray)),
        Span::styled(region, Style::default().fg(Color::Magenta)),
        Span::styled(
            "| n/p:region space:toggle click:select c:clear r:REST g:GraphQL q:quit",
            Style::default().fg(Color::DarkGray),
        ),
    ]);

    frame.render_widget(Paragraph::new(status), area);
}

/// Rect of `percent_x` by `percent_y` centered in `area`
fn centered(area: Rect, percent_x: u16, percent_y: u16) -> Rect {
    // u32 so large terminals don't overflow before the division
    let scale = |len: u16, percent: u16| (u32::from(len) * u32::from(percent.min(100)) / 100) as u16;
    let width = scale(area.width, percent_x);
    let height = scale(area.height, percent_y);
    Rect {
        x: area.x + (area.width - width) / 2,
        y: area.y + (area.height - height) / 2,
        width,
        height,
    }
}

/// 67000000 -> "67,000,000"
fn group_digits(value: u64) -> String {
    let digits = value.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}
