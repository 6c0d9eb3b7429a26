//! Application state and event loop

use std::io::{self, Write};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use crossterm::cursor::MoveTo;
use crossterm::event::{
    Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers, MouseButton, MouseEvent, MouseEventKind,
};
use crossterm::queue;
use ratatui::{
    Frame, Terminal,
    backend::Backend,
    layout::{Constraint, Direction, Layout, Position, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, List, ListItem, ListState, Paragraph},
};
use tempfile::NamedTempFile;

use crate::display::{
    self, CellGeometry, ImageRegion, Protocol, RgbFrame, halfblocks::Halfblocks, iterm2, kitty,
};
use crate::event_source::EventSource;
use crate::locator::{self, ResolvedSource};
use crate::notification::{NotificationLevel, NotificationManager};
use crate::pdf::{PageImage, RasterParams, RenderService, ServiceEvent, Zoom};
use crate::prompt::{Prompt, PromptKind};
use crate::recent::RecentFiles;
use crate::select::{PixelPoint, SelectionState};
use crate::svg::VectorOptions;

/// Selection rectangle color painted into the page pixels.
const SELECTION_RGB: (u8, u8, u8) = (0x00, 0xE1, 0xFF);
const SELECTION_THICKNESS: u32 = 2;
/// Kitty image id used for the page placement.
const PAGE_IMAGE_ID: u32 = 1;
const DEFAULT_EXPORT_NAME: &str = "selection.svg";

/// Export option toggles shown in the status bar.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ExportToggles {
    pub preserve_text: bool,
    pub merge_kerning: bool,
    pub strip_background: bool,
    pub grayscale: bool,
}

impl Default for ExportToggles {
    fn default() -> Self {
        Self {
            preserve_text: true,
            merge_kerning: false,
            strip_background: false,
            grayscale: false,
        }
    }
}

impl ExportToggles {
    #[must_use]
    pub fn vector_options(self) -> VectorOptions {
        VectorOptions {
            preserve_text: self.preserve_text,
            merge_kerning: self.merge_kerning,
            strip_background: self.strip_background,
            grayscale: self.grayscale,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Screen {
    Library,
    Viewer,
}

/// Where a finished SVG export should go.
enum SvgDestination {
    File(PathBuf),
    Clipboard,
}

/// State of one open document.
struct DocSession {
    display_name: String,
    service: RenderService,
    page_index: usize,
    page_count: usize,
    zoom: Zoom,
    page: Option<Arc<PageImage>>,
    selection: SelectionState,
    requested: Option<(usize, RasterParams)>,
    /// Keeps a downloaded document alive for the session.
    _download: Option<NamedTempFile>,
}

/// Overlay-painted pixels cropped to the viewport, plus their placement.
struct VisibleImage {
    pixels: Vec<u8>,
    width_px: u32,
    height_px: u32,
    area: Rect,
}

pub struct App {
    screen: Screen,
    protocol: Protocol,
    cells: CellGeometry,
    recent: RecentFiles,
    library_state: ListState,
    session: Option<DocSession>,
    toggles: ExportToggles,
    notifications: NotificationManager,
    prompt: Option<Prompt>,
    help_visible: bool,
    pending_svg: Option<SvgDestination>,
    visible: Option<VisibleImage>,
    visible_dirty: bool,
    needs_transmit: bool,
    should_quit: bool,
}

impl App {
    #[must_use]
    pub fn new(protocol: Protocol, cells: CellGeometry, recent: RecentFiles) -> Self {
        let mut library_state = ListState::default();
        if !recent.is_empty() {
            library_state.select(Some(0));
        }
        Self {
            screen: Screen::Library,
            protocol,
            cells,
            recent,
            library_state,
            session: None,
            toggles: ExportToggles::default(),
            notifications: NotificationManager::new(),
            prompt: None,
            help_visible: false,
            pending_svg: None,
            visible: None,
            visible_dirty: false,
            needs_transmit: false,
            should_quit: false,
        }
    }

    #[must_use]
    pub fn should_quit(&self) -> bool {
        self.should_quit
    }

    #[must_use]
    pub fn toggles(&self) -> ExportToggles {
        self.toggles
    }

    #[must_use]
    pub fn has_document(&self) -> bool {
        self.session.is_some()
    }

    #[must_use]
    pub fn has_prompt(&self) -> bool {
        self.prompt.is_some()
    }

    /// Current page, 1-indexed for display. 0 when nothing is open.
    #[must_use]
    pub fn current_page_number(&self) -> usize {
        self.session.as_ref().map_or(0, |s| s.page_index + 1)
    }

    /// Whether the current page's raster has arrived.
    #[must_use]
    pub fn page_ready(&self) -> bool {
        self.session
            .as_ref()
            .is_some_and(|session| session.page.is_some())
    }

    /// Message currently shown in the status bar, if any.
    #[must_use]
    pub fn status_message(&self) -> Option<&str> {
        self.notifications.current().map(|n| n.message.as_str())
    }

    // -------------------- opening documents --------------------

    /// Open from a path or URL, reporting failures as notifications.
    pub fn open_source(&mut self, input: &str) {
        match locator::resolve(input) {
            Ok(resolved) => self.open_document(resolved),
            Err(e) => self.notifications.error(format!("Failed to open: {e}")),
        }
    }

    fn open_document(&mut self, resolved: ResolvedSource) {
        let service = RenderService::open(resolved.path.clone());
        let Some(info) = service.document_info().cloned() else {
            self.notifications
                .error(format!("Failed to open PDF: {}", resolved.path.display()));
            return;
        };

        if resolved.is_local() {
            self.recent.add(&resolved.path);
        }

        let display_name = resolved
            .path
            .file_name()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| resolved.path.display().to_string());

        let page_index = resolved
            .target_page
            .unwrap_or(0)
            .min(info.page_count - 1);

        log::info!("opened {display_name} ({} pages)", info.page_count);

        self.session = Some(DocSession {
            display_name,
            service,
            page_index,
            page_count: info.page_count,
            zoom: Zoom::default(),
            page: None,
            selection: SelectionState::new(),
            requested: None,
            _download: resolved.download,
        });
        self.visible = None;
        self.visible_dirty = true;
        self.needs_transmit = true;
        self.screen = Screen::Viewer;
    }

    /// Jump to a 1-indexed page, warning on out-of-range input.
    pub fn goto_page_number(&mut self, n: usize) {
        let Some(session) = self.session.as_mut() else {
            return;
        };
        if n >= 1 && n <= session.page_count {
            session.page_index = n - 1;
            session.page = None;
            session.selection.clear();
            self.visible = None;
            self.visible_dirty = true;
            self.needs_transmit = true;
        } else {
            let count = session.page_count;
            self.notifications
                .warn(format!("Page must be between 1 and {count}"));
        }
    }

    fn next_page(&mut self) {
        if let Some(session) = self.session.as_ref() {
            let next = session.page_index + 2;
            if next <= session.page_count {
                self.goto_page_number(next);
            }
        }
    }

    fn prev_page(&mut self) {
        if let Some(session) = self.session.as_ref() {
            if session.page_index > 0 {
                self.goto_page_number(session.page_index);
            }
        }
    }

    // -------------------- background work --------------------

    /// Drain render results and expire notifications.
    pub fn tick(&mut self) {
        self.notifications.update();

        let events = match self.session.as_mut() {
            Some(session) => session.service.drain_events(),
            None => Vec::new(),
        };

        for event in events {
            match event {
                ServiceEvent::Page { page, data } => {
                    let mut prefetch = None;
                    if let Some(session) = self.session.as_mut() {
                        if page == session.page_index {
                            session.page = Some(data);
                            session.selection.clear();
                            self.visible_dirty = true;
                            if let Some((_, params)) = session.requested {
                                prefetch = Some((page, params));
                            }
                        }
                    }
                    if let Some((page, params)) = prefetch {
                        if let Some(session) = self.session.as_mut() {
                            session.service.prefetch_neighbors(page, params);
                        }
                    }
                }
                ServiceEvent::Svg(svg) => self.finish_export(&svg),
                ServiceEvent::Failed(message) => {
                    self.pending_svg = None;
                    self.notifications.error(message);
                }
            }
        }
    }

    // -------------------- export --------------------

    fn start_export(&mut self, destination: SvgDestination) {
        let options = self.toggles.vector_options();
        let Some(session) = self.session.as_mut() else {
            self.notifications.warn("No PDF open");
            return;
        };
        let Some(page) = session.page.as_ref() else {
            self.notifications.warn("Page is still rendering");
            return;
        };
        let Some(rect) = session.selection.rect(page.width_px, page.height_px) else {
            self.notifications.warn("No valid selection to export");
            return;
        };

        let clip = rect.to_pdf(page.scale);
        session
            .service
            .request_export(session.page_index, clip, options);
        self.pending_svg = Some(destination);
    }

    fn finish_export(&mut self, svg: &str) {
        match self.pending_svg.take() {
            Some(SvgDestination::File(path)) => match std::fs::write(&path, svg) {
                Ok(()) => self
                    .notifications
                    .info(format!("Saved: {}", path.display())),
                Err(e) => self
                    .notifications
                    .error(format!("Failed to save SVG: {e}")),
            },
            Some(SvgDestination::Clipboard) => match copy_to_clipboard(svg) {
                Ok(()) => self.notifications.info("SVG copied to clipboard"),
                Err(e) => self
                    .notifications
                    .error(format!("Failed to copy SVG: {e}")),
            },
            None => {}
        }
    }

    // -------------------- event handling --------------------

    pub fn handle_event(&mut self, event: Event) {
        match event {
            Event::Key(key) if key.kind == KeyEventKind::Press => self.on_key(key),
            Event::Mouse(mouse) => self.on_mouse(mouse),
            Event::Resize(_, _) => {
                if let Some(session) = self.session.as_mut() {
                    session.requested = None;
                }
                self.visible_dirty = true;
                self.needs_transmit = true;
            }
            _ => {}
        }
    }

    fn on_key(&mut self, key: KeyEvent) {
        if self.prompt.is_some() {
            self.on_prompt_key(key);
            return;
        }
        if self.help_visible {
            self.help_visible = false;
            return;
        }
        match self.screen {
            Screen::Library => self.on_library_key(key),
            Screen::Viewer => self.on_viewer_key(key),
        }
    }

    fn on_prompt_key(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Esc => {
                self.prompt = None;
            }
            KeyCode::Enter => {
                if let Some(prompt) = self.prompt.take() {
                    self.submit_prompt(&prompt);
                }
            }
            KeyCode::Backspace => {
                if let Some(prompt) = self.prompt.as_mut() {
                    prompt.backspace();
                }
            }
            KeyCode::Char(c) => {
                if let Some(prompt) = self.prompt.as_mut() {
                    prompt.insert(c);
                }
            }
            _ => {}
        }
    }

    fn submit_prompt(&mut self, prompt: &Prompt) {
        let value = prompt.value().trim().to_string();
        if value.is_empty() {
            return;
        }
        match prompt.kind() {
            PromptKind::Open => self.open_source(&value),
            PromptKind::GotoPage => match value.parse::<usize>() {
                Ok(n) => self.goto_page_number(n),
                Err(_) => self.notifications.warn("Please enter a valid page number"),
            },
            PromptKind::ExportPath => {
                self.start_export(SvgDestination::File(PathBuf::from(value)));
            }
        }
    }

    fn on_library_key(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Char('q') | KeyCode::Esc => self.should_quit = true,
            KeyCode::Char('j') | KeyCode::Down => self.move_library_selection(1),
            KeyCode::Char('k') | KeyCode::Up => self.move_library_selection(-1),
            KeyCode::Enter => self.open_selected_recent(),
            KeyCode::Char('o') => self.prompt = Some(Prompt::new(PromptKind::Open, "")),
            KeyCode::Char('?') => self.help_visible = true,
            _ => {}
        }
    }

    fn move_library_selection(&mut self, delta: isize) {
        let len = self.recent.entries().len();
        if len == 0 {
            return;
        }
        let current = self.library_state.selected().unwrap_or(0) as isize;
        let next = (current + delta).clamp(0, len as isize - 1) as usize;
        self.library_state.select(Some(next));
    }

    fn open_selected_recent(&mut self) {
        let Some(idx) = self.library_state.selected() else {
            return;
        };
        let Some(path) = self.recent.entries().get(idx).cloned() else {
            return;
        };
        self.open_source(path.to_string_lossy().as_ref());
    }

    fn on_viewer_key(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Char('q') => self.should_quit = true,
            KeyCode::Esc => {
                if let Some(session) = self.session.as_mut() {
                    session.selection.clear();
                }
                self.visible_dirty = true;
            }
            KeyCode::Char('l' | 'n') | KeyCode::Right => self.next_page(),
            KeyCode::Char('h' | 'p') | KeyCode::Left => self.prev_page(),
            KeyCode::Char('g') => self.prompt = Some(Prompt::new(PromptKind::GotoPage, "")),
            KeyCode::Char('+' | '=') => self.change_zoom(Zoom::step_in),
            KeyCode::Char('-') => self.change_zoom(Zoom::step_out),
            KeyCode::Char('0') => self.change_zoom(Zoom::reset),
            KeyCode::Char('t') => self.toggles.preserve_text = !self.toggles.preserve_text,
            KeyCode::Char('k') => self.toggles.merge_kerning = !self.toggles.merge_kerning,
            KeyCode::Char('b') => self.toggles.strip_background = !self.toggles.strip_background,
            KeyCode::Char('d') => self.toggles.grayscale = !self.toggles.grayscale,
            KeyCode::Char('e') => {
                if self.has_exportable_selection() {
                    self.prompt = Some(Prompt::new(PromptKind::ExportPath, DEFAULT_EXPORT_NAME));
                } else {
                    self.notifications.warn("No valid selection to export");
                }
            }
            KeyCode::Char('y') => self.start_export(SvgDestination::Clipboard),
            KeyCode::Char('o') => self.prompt = Some(Prompt::new(PromptKind::Open, "")),
            KeyCode::Char('r') => self.show_library(),
            KeyCode::Char('?') => self.help_visible = true,
            _ => {}
        }
    }

    fn has_exportable_selection(&self) -> bool {
        self.session.as_ref().is_some_and(|session| {
            session.page.as_ref().is_some_and(|page| {
                session
                    .selection
                    .rect(page.width_px, page.height_px)
                    .is_some()
            })
        })
    }

    fn show_library(&mut self) {
        self.screen = Screen::Library;
        self.visible = None;
        self.needs_transmit = true;
        let len = self.recent.entries().len();
        self.library_state
            .select(if len > 0 { Some(0) } else { None });
    }

    fn change_zoom(&mut self, step: impl FnOnce(&mut Zoom)) {
        if let Some(session) = self.session.as_mut() {
            let before = session.zoom.factor();
            step(&mut session.zoom);
            if (session.zoom.factor() - before).abs() > f32::EPSILON {
                // the raster is about to change scale, so the old
                // selection's pixel coordinates no longer apply
                session.selection.clear();
                self.visible_dirty = true;
            }
        }
    }

    fn on_mouse(&mut self, mouse: MouseEvent) {
        if self.screen != Screen::Viewer || self.prompt.is_some() {
            return;
        }
        match mouse.kind {
            MouseEventKind::ScrollUp if mouse.modifiers.contains(KeyModifiers::CONTROL) => {
                self.change_zoom(Zoom::step_in);
            }
            MouseEventKind::ScrollDown if mouse.modifiers.contains(KeyModifiers::CONTROL) => {
                self.change_zoom(Zoom::step_out);
            }
            MouseEventKind::Down(MouseButton::Left) => {
                let hit = self.image_pixel_at(mouse.column, mouse.row);
                if let Some(session) = self.session.as_mut() {
                    match hit {
                        Some(point) => session.selection.start_at(point),
                        None => session.selection.clear(),
                    }
                    self.visible_dirty = true;
                }
            }
            MouseEventKind::Drag(MouseButton::Left) => {
                let point = self.image_pixel_clamped(mouse.column, mouse.row);
                if let (Some(point), Some(session)) = (point, self.session.as_mut()) {
                    if session.selection.is_dragging() {
                        session.selection.update_end(point);
                        self.visible_dirty = true;
                    }
                }
            }
            MouseEventKind::Up(MouseButton::Left) => {
                if let Some(session) = self.session.as_mut() {
                    session.selection.finish();
                }
            }
            _ => {}
        }
    }

    /// Map a terminal cell inside the image placement to image pixels.
    fn image_pixel_at(&self, column: u16, row: u16) -> Option<PixelPoint> {
        let visible = self.visible.as_ref()?;
        if !visible.area.contains(Position::new(column, row)) {
            return None;
        }
        Some(self.cell_to_pixel(visible, column, row))
    }

    /// Same as [`Self::image_pixel_at`] but clamps cells outside the
    /// placement onto its edge, for drag events that leave the image.
    fn image_pixel_clamped(&self, column: u16, row: u16) -> Option<PixelPoint> {
        let visible = self.visible.as_ref()?;
        let column = column.clamp(
            visible.area.x,
            visible.area.x + visible.area.width.saturating_sub(1),
        );
        let row = row.clamp(
            visible.area.y,
            visible.area.y + visible.area.height.saturating_sub(1),
        );
        Some(self.cell_to_pixel(visible, column, row))
    }

    fn cell_to_pixel(&self, visible: &VisibleImage, column: u16, row: u16) -> PixelPoint {
        PixelPoint {
            x: u32::from(column - visible.area.x) * u32::from(self.cells.width_px),
            y: u32::from(row - visible.area.y) * u32::from(self.cells.height_px),
        }
    }

    // -------------------- drawing --------------------

    pub fn draw(&mut self, f: &mut Frame) {
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Min(1), Constraint::Length(1)])
            .split(f.area());

        match self.screen {
            Screen::Library => self.draw_library(f, chunks[0]),
            Screen::Viewer => self.draw_viewer(f, chunks[0]),
        }
        self.draw_status(f, chunks[1]);

        if let Some(prompt) = self.prompt.clone() {
            draw_prompt(f, &prompt);
        }
        if self.help_visible {
            draw_help(f);
        }
    }

    fn draw_library(&mut self, f: &mut Frame, area: Rect) {
        let block = Block::default()
            .borders(Borders::ALL)
            .title(" pdfsnip - recent files ");

        if self.recent.is_empty() {
            let hint = Paragraph::new("No recent files.\n\nPress 'o' to open a PDF by path or URL.")
                .block(block)
                .style(Style::default().fg(Color::DarkGray));
            f.render_widget(hint, area);
            return;
        }

        let items: Vec<ListItem> = self
            .recent
            .entries()
            .iter()
            .map(|path| {
                let name = path
                    .file_name()
                    .map(|s| s.to_string_lossy().into_owned())
                    .unwrap_or_else(|| path.display().to_string());
                ListItem::new(Line::from(vec![
                    Span::raw(name),
                    Span::styled(
                        format!("  {}", path.display()),
                        Style::default().fg(Color::DarkGray),
                    ),
                ]))
            })
            .collect();

        let list = List::new(items)
            .block(block)
            .highlight_style(Style::default().add_modifier(Modifier::REVERSED));
        f.render_stateful_widget(list, area, &mut self.library_state);
    }

    fn draw_viewer(&mut self, f: &mut Frame, area: Rect) {
        self.ensure_page_requested(area);
        self.rebuild_visible(area);

        match &self.visible {
            Some(visible) => {
                let frame = RgbFrame {
                    pixels: &visible.pixels,
                    width: visible.width_px,
                    height: visible.height_px,
                };
                if self.protocol == Protocol::Halfblocks {
                    f.render_widget(Halfblocks::new(frame), visible.area);
                } else {
                    f.render_widget(ImageRegion, visible.area);
                }
            }
            None => {
                let message = if self.session.is_some() {
                    "Rendering page..."
                } else {
                    "No document open. Press 'o' to open one."
                };
                let placeholder = Paragraph::new(message)
                    .style(Style::default().fg(Color::DarkGray));
                f.render_widget(placeholder, area);
            }
        }
    }

    /// Ask the render service for the current page whenever the wanted
    /// parameters differ from the last request.
    fn ensure_page_requested(&mut self, area: Rect) {
        let viewport_width_px = u32::from(area.width) * u32::from(self.cells.width_px);
        if viewport_width_px == 0 {
            return;
        }
        let Some(session) = self.session.as_mut() else {
            return;
        };
        let params = RasterParams {
            viewport_width_px,
            zoom: session.zoom.factor(),
        };
        let want = (session.page_index, params);
        if session.requested != Some(want) {
            session.service.request_page(session.page_index, params);
            session.requested = Some(want);
        }
    }

    /// Crop the page raster to the viewport and bake in the selection.
    fn rebuild_visible(&mut self, area: Rect) {
        let Some(session) = self.session.as_ref() else {
            self.visible = None;
            return;
        };
        let Some(page) = session.page.as_ref() else {
            self.visible = None;
            return;
        };

        let (cells_w, cells_h) = self.cells.cells_for(page.width_px, page.height_px);
        let place_w = cells_w.min(area.width);
        let place_h = cells_h.min(area.height);
        if place_w == 0 || place_h == 0 {
            self.visible = None;
            return;
        }
        let origin_x = area.x + (area.width - place_w) / 2;
        let place = Rect::new(origin_x, area.y, place_w, place_h);

        if !self.visible_dirty {
            if let Some(visible) = &self.visible {
                if visible.area == place {
                    return;
                }
            }
        }

        let visible_h_px = (u32::from(place_h) * u32::from(self.cells.height_px))
            .min(page.height_px);
        let byte_len = (visible_h_px * page.width_px * 3) as usize;
        let mut pixels = page.pixels[..byte_len.min(page.pixels.len())].to_vec();

        if let Some(rect) = session.selection.rect(page.width_px, visible_h_px) {
            display::paint_rect_outline(
                &mut pixels,
                page.width_px,
                visible_h_px,
                rect,
                SELECTION_RGB,
                SELECTION_THICKNESS,
            );
        }

        self.visible = Some(VisibleImage {
            pixels,
            width_px: page.width_px,
            height_px: visible_h_px,
            area: place,
        });
        self.visible_dirty = false;
        self.needs_transmit = true;
    }

    fn draw_status(&self, f: &mut Frame, area: Rect) {
        let mut spans: Vec<Span> = Vec::new();

        if let Some(notification) = self.notifications.current() {
            let color = match notification.level {
                NotificationLevel::Info => Color::Green,
                NotificationLevel::Warning => Color::Yellow,
                NotificationLevel::Error => Color::Red,
            };
            spans.push(Span::styled(
                notification.message.clone(),
                Style::default().fg(color),
            ));
        } else if let Some(session) = &self.session {
            spans.push(Span::styled(
                session.display_name.clone(),
                Style::default().add_modifier(Modifier::BOLD),
            ));
            spans.push(Span::raw(format!(
                "  {}/{}",
                session.page_index + 1,
                session.page_count
            )));
            spans.push(Span::raw(format!(
                "  {:.0}%",
                session.zoom.factor() * 100.0
            )));
            spans.push(Span::raw("  "));
            spans.push(toggle_span("text", self.toggles.preserve_text));
            spans.push(Span::raw(" "));
            spans.push(toggle_span("kern", self.toggles.merge_kerning));
            spans.push(Span::raw(" "));
            spans.push(toggle_span("nobg", self.toggles.strip_background));
            spans.push(Span::raw(" "));
            spans.push(toggle_span("gray", self.toggles.grayscale));
            spans.push(Span::styled(
                "  drag: select  e: export  y: copy  ?: help",
                Style::default().fg(Color::DarkGray),
            ));
        } else {
            spans.push(Span::styled(
                "o: open  Enter: open recent  ?: help  q: quit",
                Style::default().fg(Color::DarkGray),
            ));
        }

        f.render_widget(Paragraph::new(Line::from(spans)), area);
    }

    /// Write image escapes for the current placement, if anything changed.
    pub fn flush_graphics(&mut self, out: &mut impl Write) -> io::Result<()> {
        if self.protocol == Protocol::Halfblocks || !self.needs_transmit {
            return Ok(());
        }

        match &self.visible {
            Some(visible) => {
                queue!(out, MoveTo(visible.area.x, visible.area.y))?;
                let frame = RgbFrame {
                    pixels: &visible.pixels,
                    width: visible.width_px,
                    height: visible.height_px,
                };
                match self.protocol {
                    Protocol::Kitty => {
                        kitty::delete(out, PAGE_IMAGE_ID)?;
                        kitty::transmit(out, PAGE_IMAGE_ID, &frame)?;
                    }
                    Protocol::Iterm2 => {
                        iterm2::transmit(out, &frame, visible.area.width, visible.area.height)?;
                    }
                    Protocol::Halfblocks => {}
                }
            }
            None => {
                if self.protocol == Protocol::Kitty {
                    kitty::delete(out, PAGE_IMAGE_ID)?;
                }
            }
        }

        out.flush()?;
        self.needs_transmit = false;
        Ok(())
    }
}

fn toggle_span(label: &str, on: bool) -> Span<'static> {
    if on {
        Span::styled(
            format!("[{label}]"),
            Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
        )
    } else {
        Span::styled(format!(" {label} "), Style::default().fg(Color::DarkGray))
    }
}

fn draw_prompt(f: &mut Frame, prompt: &Prompt) {
    let area = centered_rect(60, 3, f.area());
    f.render_widget(Clear, area);
    let input = Paragraph::new(format!("{}_", prompt.value())).block(
        Block::default()
            .borders(Borders::ALL)
            .title(format!(" {} ", prompt.kind().title())),
    );
    f.render_widget(input, area);
}

fn draw_help(f: &mut Frame) {
    let lines = [
        "h/l, arrows   previous/next page",
        "g             go to page",
        "+/-/0         zoom in/out/reset (also Ctrl+scroll)",
        "mouse drag    select region",
        "t             toggle: preserve text",
        "k             toggle: merge kerning",
        "b             toggle: remove background",
        "d             toggle: grayscale",
        "e             export selection as SVG",
        "y             copy selection SVG to clipboard",
        "o             open path or URL",
        "r             recent files",
        "q             quit",
    ];
    let height = lines.len() as u16 + 2;
    let area = centered_rect(56, height, f.area());
    f.render_widget(Clear, area);
    let text = lines.iter().map(|l| Line::from(*l)).collect::<Vec<_>>();
    let help = Paragraph::new(text).block(
        Block::default()
            .borders(Borders::ALL)
            .title(" keys (any key to close) "),
    );
    f.render_widget(help, area);
}

/// Centered popup: `percent_x` of the width, fixed height in rows.
fn centered_rect(percent_x: u16, height: u16, r: Rect) -> Rect {
    let width = r.width * percent_x / 100;
    let x = r.x + (r.width.saturating_sub(width)) / 2;
    let y = r.y + (r.height.saturating_sub(height)) / 2;
    Rect::new(x, y, width, height.min(r.height))
}

/// Main loop: tick, draw, push graphics, handle one event.
pub fn run_with_event_source<B: Backend>(
    app: &mut App,
    terminal: &mut Terminal<B>,
    events: &mut dyn EventSource,
) -> Result<()> {
    let tick_rate = Duration::from_millis(50);

    loop {
        app.tick();
        terminal.draw(|f| app.draw(f))?;
        {
            let mut out = io::stdout().lock();
            app.flush_graphics(&mut out)?;
        }

        if events.poll(tick_rate)? {
            let event = events.read()?;
            app.handle_event(event);
        }

        if app.should_quit() {
            return Ok(());
        }
    }
}

fn copy_to_clipboard(text: &str) -> Result<()> {
    let mut clipboard = arboard::Clipboard::new()?;
    clipboard.set_text(text.to_string())?;
    Ok(())
}
