//! Desktop icon grid layout and wallpaper background styling.

use crate::{
    desktop_settings::DesktopSettings,
    model::{IconArrangement, IconSize, WallpaperPosition},
};

#[derive(Debug, Clone, PartialEq, Eq)]
/// Icon id placed in one grid cell.
pub struct IconPlacement {
    /// Desktop icon id.
    pub icon_id: String,
    /// Zero-based column.
    pub column: usize,
    /// Zero-based row.
    pub row: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
/// Fixed-size column-major desktop icon grid.
pub struct IconGrid {
    columns: usize,
    rows: usize,
    cells: Vec<Option<String>>,
}

impl IconGrid {
    /// Lays out `icon_ids` for the given size and arrangement.
    ///
    /// `Auto` packs row-first within each column and wraps back to column 0 when the grid is
    /// full, so icons past capacity overwrite earlier cells. `Normal` maps index `i` to
    /// `(i / rows, i % rows)` and drops icons past capacity.
    pub fn layout(icon_ids: &[String], size: IconSize, arrangement: IconArrangement) -> Self {
        let (columns, rows) = size.grid_dimensions();
        let mut grid = Self {
            columns,
            rows,
            cells: vec![None; columns * rows],
        };
        match arrangement {
            IconArrangement::Auto => {
                let (mut column, mut row) = (0, 0);
                for id in icon_ids {
                    grid.put(column, row, id);
                    row += 1;
                    if row >= rows {
                        row = 0;
                        column += 1;
                        if column >= columns {
                            column = 0;
                        }
                    }
                }
            }
            IconArrangement::Normal => {
                for (index, id) in icon_ids.iter().enumerate() {
                    let (column, row) = (index / rows, index % rows);
                    if column < columns {
                        grid.put(column, row, id);
                    }
                }
            }
        }
        grid
    }

    /// Lays out the icons of a settings snapshot.
    pub fn from_settings(settings: &DesktopSettings) -> Self {
        Self::layout(
            &settings.icon_ids,
            settings.icon_size,
            settings.icon_arrangement,
        )
    }

    fn put(&mut self, column: usize, row: usize, id: &str) {
        self.cells[column * self.rows + row] = Some(id.to_string());
    }

    /// Grid dimensions as `(columns, rows)`.
    pub fn dimensions(&self) -> (usize, usize) {
        (self.columns, self.rows)
    }

    /// Icon at a cell, if any.
    pub fn cell(&self, column: usize, row: usize) -> Option<&str> {
        if column >= self.columns || row >= self.rows {
            return None;
        }
        self.cells[column * self.rows + row].as_deref()
    }

    /// Occupied cells in column-major order.
    pub fn placements(&self) -> Vec<IconPlacement> {
        self.cells
            .iter()
            .enumerate()
            .filter_map(|(index, cell)| {
                cell.as_ref().map(|icon_id| IconPlacement {
                    icon_id: icon_id.clone(),
                    column: index / self.rows,
                    row: index % self.rows,
                })
            })
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
/// CSS background properties for the desktop surface.
pub struct BackgroundStyle {
    /// `background-image` URL.
    pub image: Option<String>,
    /// `background-size`.
    pub size: &'static str,
    /// `background-repeat`.
    pub repeat: &'static str,
    /// `background-position`.
    pub position: &'static str,
    /// `background-color`.
    pub color: Option<String>,
}

impl BackgroundStyle {
    /// Builds the style for a wallpaper, its placement, and the background color.
    pub fn new(wallpaper: Option<&str>, position: WallpaperPosition, color: &str) -> Self {
        let Some(url) = wallpaper.filter(|url| !url.is_empty()) else {
            return Self {
                image: None,
                size: "auto",
                repeat: "no-repeat",
                position: "center center",
                color: Some(color.to_string()),
            };
        };
        let image = Some(url.to_string());
        match position {
            WallpaperPosition::Stretch => Self {
                image,
                size: "cover",
                repeat: "no-repeat",
                position: "center",
                color: None,
            },
            WallpaperPosition::Tile => Self {
                image,
                size: "auto",
                repeat: "repeat",
                position: "0 0",
                color: None,
            },
            WallpaperPosition::Center => Self {
                image,
                size: "auto",
                repeat: "no-repeat",
                position: "center center",
                color: Some(color.to_string()),
            },
        }
    }

    /// Style of a settings snapshot.
    pub fn from_settings(settings: &DesktopSettings) -> Self {
        Self::new(
            settings.wallpaper.as_deref(),
            settings.wallpaper_position,
            &settings.background_color,
        )
    }

    /// Inline `style` attribute value.
    pub fn to_css(&self) -> String {
        let mut css = String::new();
        if let Some(url) = &self.image {
            css.push_str(&format!("background-image: url(\"{url}\"); "));
        }
        css.push_str(&format!(
            "background-size: {}; background-repeat: {}; background-position: {};",
            self.size, self.repeat, self.position
        ));
        if let Some(color) = &self.color {
            css.push_str(&format!(" background-color: {color};"));
        }
        css
    }
}
