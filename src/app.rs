use crate::dashboard::Dashboard;
use crate::data::Atlas;
use crate::map::{Highlight, Viewport};
use crate::workflow::{CompletionReceiver, Launcher, Region};
use geo::Centroid;
use tracing::debug;

/// Application state
pub struct App {
    pub viewport: Viewport,
    pub atlas: Atlas,
    pub dashboard: Dashboard,
    pub should_quit: bool,
    /// Last mouse position for drag tracking
    pub last_mouse: Option<(u16, u16)>,
    /// Current mouse position for cursor marker
    pub mouse_pos: Option<(u16, u16)>,
    /// Set once a press turns into a drag, so release does not select
    dragged: bool,
    /// Region indices sorted by name, walked by the region cursor
    order: Vec<usize>,
    /// Position in `order`
    cursor: Option<usize>,
    launcher: Launcher,
    completions: CompletionReceiver,
}

impl App {
    pub fn new(
        atlas: Atlas,
        launcher: Launcher,
        completions: CompletionReceiver,
        width: usize,
        height: usize,
    ) -> Self {
        let mut order: Vec<usize> = (0..atlas.len()).collect();
        order.sort_by(|&a, &b| atlas.regions[a].name.cmp(&atlas.regions[b].name));

        let mut app = Self {
            viewport: Viewport::world(0, 0),
            atlas,
            dashboard: Dashboard::new(),
            should_quit: false,
            last_mouse: None,
            mouse_pos: None,
            dragged: false,
            order,
            cursor: None,
            launcher,
            completions,
        };
        app.resize(width, height);
        app
    }

    /// Update viewport size when terminal resizes
    pub fn resize(&mut self, width: usize, height: usize) {
        let (cols, rows) = crate::ui::map_inner_size(width as u16, height as u16);
        // Braille gives 2x4 resolution per character
        self.viewport.width = cols as usize * 2;
        self.viewport.height = rows as usize * 4;
    }

    pub fn pan(&mut self, dx: i32, dy: i32) {
        self.viewport.pan(dx, dy);
    }

    pub fn zoom_in(&mut self) {
        self.viewport.zoom_in();
    }

    pub fn zoom_out(&mut self) {
        self.viewport.zoom_out();
    }

    pub fn zoom_in_at(&mut self, col: u16, row: u16) {
        let (px, py) = to_pixels(col, row);
        self.viewport.zoom_in_at(px, py);
    }

    pub fn zoom_out_at(&mut self, col: u16, row: u16) {
        let (px, py) = to_pixels(col, row);
        self.viewport.zoom_out_at(px, py);
    }

    pub fn quit(&mut self) {
        self.should_quit = true;
    }

    pub fn zoom_level(&self) -> String {
        format!("{:.1}x", self.viewport.zoom)
    }

    pub fn center_coords(&self) -> String {
        format!(
            "{:.1}°{}, {:.1}°{}",
            self.viewport.center_lat.abs(),
            if self.viewport.center_lat >= 0.0 { "N" } else { "S" },
            self.viewport.center_lon.abs(),
            if self.viewport.center_lon >= 0.0 { "E" } else { "W" }
        )
    }

    pub fn begin_drag(&mut self, col: u16, row: u16) {
        self.last_mouse = Some((col, row));
        self.dragged = false;
    }

    pub fn handle_drag(&mut self, col: u16, row: u16) {
        if let Some((last_col, last_row)) = self.last_mouse {
            let dx = (last_col as i32 - col as i32) * 2;
            let dy = (last_row as i32 - row as i32) * 4;
            if dx != 0 || dy != 0 {
                self.dragged = true;
                self.pan(dx, dy);
            }
        }
        self.last_mouse = Some((col, row));
    }

    /// Button released: a press without drag selects the region under it
    pub fn end_drag(&mut self, col: u16, row: u16) {
        let clicked = self.last_mouse.is_some() && !self.dragged;
        self.last_mouse = None;
        self.dragged = false;
        if clicked {
            self.click(col, row);
        }
    }

    pub fn set_mouse_pos(&mut self, col: u16, row: u16) {
        self.mouse_pos = Some((col, row));
    }

    /// Mouse position in braille pixel coordinates (for rendering marker)
    pub fn mouse_pixel_pos(&self) -> Option<(i32, i32)> {
        self.mouse_pos.map(|(col, row)| to_pixels(col, row))
    }

    /// Toggle the region under a terminal cell of the map
    pub fn click(&mut self, col: u16, row: u16) {
        let (px, py) = to_pixels(col, row);
        let (lon, lat) = self.viewport.unproject(px, py);
        match self.atlas.region_at(lon, lat) {
            Some(index) => self.toggle_region(index),
            None => debug!(lon, lat, "click outside any region"),
        }
    }

    /// Add the region to the selection or take it out
    pub fn toggle_region(&mut self, index: usize) {
        if self.dashboard.is_dialog_open() {
            return;
        }
        let Some(region) = self.atlas.regions.get(index) else {
            return;
        };

        let mut selection = self.dashboard.selection().to_vec();
        match selection.iter().position(|id| *id == region.id) {
            Some(pos) => {
                selection.remove(pos);
            }
            None => selection.push(region.id.clone()),
        }
        self.dashboard.update_selection(selection, &self.atlas.regions);
    }

    pub fn clear_selection(&mut self) {
        if !self.dashboard.is_dialog_open() {
            self.dashboard.update_selection(Vec::new(), &self.atlas.regions);
        }
    }

    /// Move the region cursor by `step` in name order and center on it
    pub fn move_cursor(&mut self, step: isize) {
        if self.order.is_empty() {
            return;
        }
        let len = self.order.len() as isize;
        let next = match self.cursor {
            Some(pos) => (pos as isize + step).rem_euclid(len),
            None if step < 0 => len - 1,
            None => 0,
        } as usize;
        self.cursor = Some(next);

        let index = self.order[next];
        if let Some(center) = self.atlas.shapes[index].centroid() {
            self.viewport.center_on(center.x(), center.y());
        }
    }

    /// Region index under the cursor
    pub fn cursor_region(&self) -> Option<usize> {
        self.cursor.map(|pos| self.order[pos])
    }

    pub fn cursor_region_info(&self) -> Option<&Region> {
        self.cursor_region().map(|index| &self.atlas.regions[index])
    }

    pub fn toggle_cursor_region(&mut self) {
        if let Some(index) = self.cursor_region() {
            self.toggle_region(index);
        }
    }

    /// Pick a protocol and open the dialog, launching its lookups
    pub fn open_dialog(&mut self, choice: &str) {
        self.dashboard.choose_protocol(choice);
        if let Some(run) = self.dashboard.invoke_popup() {
            self.launcher.launch(run);
        }
    }

    pub fn close_dialog(&mut self) {
        self.dashboard.close_dialog();
    }

    /// Apply every completion that arrived since the last frame
    pub fn drain_completions(&mut self) -> usize {
        let mut applied = 0;
        while let Ok(completion) = self.completions.try_recv() {
            if self.dashboard.apply(completion) {
                applied += 1;
            }
        }
        applied
    }

    /// Highlight for each region index, for the renderer
    pub fn highlights(&self) -> Vec<Highlight> {
        let mut highlights = vec![Highlight::None; self.atlas.len()];
        for id in self.dashboard.selection() {
            if let Some(index) = self.atlas.position(id) {
                highlights[index] = Highlight::Selected;
            }
        }
        if let Some(index) = self.cursor_region() {
            highlights[index] = Highlight::Cursor;
        }
        highlights
    }
}

/// Terminal cell to braille pixel, accounting for the 1-cell map border
fn to_pixels(col: u16, row: u16) -> (i32, i32) {
    (col.saturating_sub(1) as i32 * 2, row.saturating_sub(1) as i32 * 4)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::tests::sample_atlas;
    use crate::workflow::fakes::FakeSource;
    use crate::workflow::{CountryRecord, Protocol};
    use std::sync::Arc;

    fn app_with(source: Arc<FakeSource>) -> App {
        let (launcher, receiver) = Launcher::new(source);
        App::new(sample_atlas(), launcher, receiver, 120, 40)
    }

    fn app() -> App {
        app_with(Arc::new(FakeSource::default()))
    }

    #[test]
    fn test_toggle_region_adds_and_removes() {
        let mut app = app();
        app.toggle_region(1);
        app.toggle_region(0);
        assert_eq!(app.dashboard.selection(), ["1".to_string(), "0".to_string()]);
        assert_eq!(app.dashboard.display_items()[0].name, "Beta - BBB");

        app.toggle_region(1);
        assert_eq!(app.dashboard.selection(), ["0".to_string()]);

        app.toggle_region(99);
        assert_eq!(app.dashboard.selection().len(), 1);

        app.clear_selection();
        assert!(app.dashboard.display_items().is_empty());
    }

    #[test]
    fn test_click_selects_region_under_pointer() {
        let mut app = app();
        app.viewport.center_on(5.0, 5.0);
        app.viewport.zoom = 8.0;
        // Map center pixel maps back to the center coordinate
        let col = (app.viewport.width / 4) as u16 + 1;
        let row = (app.viewport.height / 8) as u16 + 1;
        app.click(col, row);
        assert_eq!(app.dashboard.selection(), ["0".to_string()]);
    }

    #[test]
    fn test_drag_does_not_select() {
        let mut app = app();
        app.viewport.center_on(5.0, 5.0);
        app.viewport.zoom = 8.0;
        let col = (app.viewport.width / 4) as u16 + 1;
        let row = (app.viewport.height / 8) as u16 + 1;
        app.begin_drag(col, row);
        app.handle_drag(col + 3, row);
        app.end_drag(col + 3, row);
        assert!(app.dashboard.selection().is_empty());
    }

    #[test]
    fn test_cursor_walks_names_and_wraps() {
        let mut app = app();
        app.move_cursor(1);
        assert_eq!(app.cursor_region_info().unwrap().name, "Alpha Land");
        app.move_cursor(1);
        assert_eq!(app.cursor_region_info().unwrap().name, "Beta");
        app.move_cursor(1);
        assert_eq!(app.cursor_region_info().unwrap().name, "CCC");
        app.move_cursor(1);
        assert_eq!(app.cursor_region_info().unwrap().name, "Alpha Land");

        app.toggle_cursor_region();
        assert_eq!(app.dashboard.selection(), ["0".to_string()]);
        let highlights = app.highlights();
        assert_eq!(highlights[0], Highlight::Cursor);

        app.move_cursor(-1);
        assert_eq!(app.cursor_region_info().unwrap().name, "CCC");
        assert_eq!(app.highlights()[0], Highlight::Selected);
    }

    #[test]
    fn test_selection_frozen_while_dialog_open() {
        let mut app = app();
        app.toggle_region(0);
        app.dashboard.choose_protocol("GraphQL");
        assert!(app.dashboard.invoke_popup().is_some());
        app.toggle_region(1);
        app.clear_selection();
        assert_eq!(app.dashboard.selection(), ["0".to_string()]);
    }

    #[tokio::test]
    async fn test_open_dialog_runs_lookups() {
        let record = CountryRecord {
            name: "Alpha Land".into(),
            code: "AAA".into(),
            population: 5,
        };
        let source = Arc::new(FakeSource::default().graphql(Some(vec![record.clone()])));
        let mut app = app_with(source.clone());
        app.toggle_region(0);
        app.open_dialog("GraphQL");
        assert_eq!(app.dashboard.protocol(), Some(Protocol::GraphQl));

        // Let the spawned lookup finish
        while source.call_count() == 0 || app.drain_completions() == 0 {
            tokio::task::yield_now().await;
        }
        assert_eq!(app.dashboard.records(), [record]);
        assert_eq!(app.dashboard.title(), "Protocol: GraphQL - Calls Made: 1");

        app.close_dialog();
        assert!(!app.dashboard.is_dialog_open());
    }

    #[test]
    fn test_open_dialog_without_selection_does_nothing() {
        let source = Arc::new(FakeSource::default());
        let mut app = app_with(source.clone());
        app.open_dialog("REST");
        assert!(!app.dashboard.is_dialog_open());
        assert_eq!(source.call_count(), 0);
    }
}
