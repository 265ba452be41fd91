//! Per-database rendering styles, one row per layer in `dataproperties`.

use anyhow::{bail, Context, Result};
use rusqlite::{params, Connection, OptionalExtension, Row};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::db::{table_exists, SpatialDatabase};

pub(crate) const STYLE_TABLE: &str = "dataproperties";

const CREATE_STYLE_TABLE: &str = "CREATE TABLE IF NOT EXISTS dataproperties (
    name TEXT PRIMARY KEY,
    size REAL,
    fillcolor TEXT,
    strokecolor TEXT,
    fillalpha REAL,
    strokealpha REAL,
    shape TEXT,
    width REAL,
    textsize REAL,
    textfield TEXT,
    enabled INTEGER,
    layerorder INTEGER,
    decimationfactor REAL
)";

const STYLE_COLUMNS: &str = "name, size, fillcolor, strokecolor, fillalpha, strokealpha, shape, width, \
                             textsize, textfield, enabled, layerorder, decimationfactor";

/// Rendering attributes of one layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Style {
    /// Layer (table) name the style belongs to.
    pub name: String,
    pub size: f64,
    pub fill_color: String,
    pub stroke_color: String,
    pub fill_alpha: f64,
    pub stroke_alpha: f64,
    pub shape: String,
    pub width: f64,
    pub text_size: f64,
    pub text_field: String,
    pub enabled: bool,
    pub order: i64,
    pub decimation: f64,
}

impl Default for Style {
    fn default() -> Self {
        Self {
            name: String::new(),
            size: 5.0,
            fill_color: "red".to_string(),
            stroke_color: "black".to_string(),
            fill_alpha: 0.3,
            stroke_alpha: 1.0,
            shape: "square".to_string(),
            width: 3.0,
            text_size: 5.0,
            text_field: String::new(),
            enabled: true,
            order: 0,
            decimation: 1.0,
        }
    }
}

impl Style {
    /// The default style for a layer.
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into(), ..Self::default() }
    }

    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        let d = Self::default();
        Ok(Self {
            name: row.get(0)?,
            size: row.get::<_, Option<f64>>(1)?.unwrap_or(d.size),
            fill_color: row.get::<_, Option<String>>(2)?.unwrap_or(d.fill_color),
            stroke_color: row.get::<_, Option<String>>(3)?.unwrap_or(d.stroke_color),
            fill_alpha: row.get::<_, Option<f64>>(4)?.unwrap_or(d.fill_alpha),
            stroke_alpha: row.get::<_, Option<f64>>(5)?.unwrap_or(d.stroke_alpha),
            shape: row.get::<_, Option<String>>(6)?.unwrap_or(d.shape),
            width: row.get::<_, Option<f64>>(7)?.unwrap_or(d.width),
            text_size: row.get::<_, Option<f64>>(8)?.unwrap_or(d.text_size),
            text_field: row.get::<_, Option<String>>(9)?.unwrap_or(d.text_field),
            enabled: row.get::<_, Option<i64>>(10)?.map_or(d.enabled, |v| v != 0),
            order: row.get::<_, Option<i64>>(11)?.unwrap_or(d.order),
            decimation: row.get::<_, Option<f64>>(12)?.unwrap_or(d.decimation),
        })
    }

    /// Set one attribute from its stored column name, e.g. `fillcolor=blue`.
    pub fn set(&mut self, key: &str, value: &str) -> Result<()> {
        let value = value.trim();
        let number = || value.parse::<f64>()
            .with_context(|| format!("[catalog::style] '{value}' is not a number for {key}"));
        match key.trim().to_lowercase().as_str() {
            "size" => self.size = number()?,
            "fillcolor" => self.fill_color = value.to_string(),
            "strokecolor" => self.stroke_color = value.to_string(),
            "fillalpha" => self.fill_alpha = number()?,
            "strokealpha" => self.stroke_alpha = number()?,
            "shape" => self.shape = value.to_string(),
            "width" => self.width = number()?,
            "textsize" => self.text_size = number()?,
            "textfield" => self.text_field = value.to_string(),
            "enabled" => self.enabled = matches!(value.to_lowercase().as_str(), "1" | "true" | "yes"),
            "layerorder" | "order" => self.order = value.parse()
                .with_context(|| format!("[catalog::style] '{value}' is not an integer order"))?,
            "decimationfactor" | "decimation" => self.decimation = number()?,
            other => bail!("[catalog::style] unknown style attribute '{other}'"),
        }
        Ok(())
    }
}

/// Create the style table when absent. Returns true when it was created.
pub(crate) fn ensure_style_table(conn: &Connection) -> Result<bool> {
    if table_exists(conn, STYLE_TABLE)? {
        return Ok(false);
    }
    conn.execute_batch(CREATE_STYLE_TABLE)
        .context("[catalog::style] Failed to create style table")?;
    info!("created style table");
    Ok(true)
}

/// Insert a default row for every layer without one. Returns the number inserted.
pub(crate) fn seed_default_styles<'a>(conn: &Connection, layers: impl IntoIterator<Item = &'a str>) -> Result<usize> {
    let tx = conn.unchecked_transaction()
        .context("[catalog::style] Failed to start style seeding")?;
    let mut inserted = 0;
    {
        let mut stmt = tx.prepare(&format!(
            "INSERT INTO {STYLE_TABLE} ({STYLE_COLUMNS}) \
             SELECT ?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13 \
             WHERE NOT EXISTS (SELECT 1 FROM {STYLE_TABLE} WHERE name = ?1)"
        ))?;
        for layer in layers {
            let s = Style::new(layer);
            inserted += stmt.execute(params![
                s.name, s.size, s.fill_color, s.stroke_color, s.fill_alpha, s.stroke_alpha, s.shape,
                s.width, s.text_size, s.text_field, s.enabled, s.order, s.decimation,
            ])?;
        }
    }
    tx.commit().context("[catalog::style] Failed to commit default styles")?;
    if inserted > 0 {
        debug!(inserted, "seeded default styles");
    }
    Ok(inserted)
}

/// Read the stored style of a layer.
pub(crate) fn read_style(conn: &Connection, layer: &str) -> Result<Option<Style>> {
    conn.query_row(
        &format!("SELECT {STYLE_COLUMNS} FROM {STYLE_TABLE} WHERE name = ?1"),
        [layer],
        Style::from_row,
    )
    .optional()
    .with_context(|| format!("[catalog::style] Failed to read style of {layer}"))
}

/// Overwrite the stored row of a layer. Never inserts. Returns the number of rows changed.
pub(crate) fn write_style(conn: &Connection, style: &Style) -> Result<usize> {
    conn.execute(
        &format!(
            "UPDATE {STYLE_TABLE} SET size = ?2, fillcolor = ?3, strokecolor = ?4, fillalpha = ?5, \
             strokealpha = ?6, shape = ?7, width = ?8, textsize = ?9, textfield = ?10, enabled = ?11, \
             layerorder = ?12, decimationfactor = ?13 WHERE name = ?1"
        ),
        params![
            style.name, style.size, style.fill_color, style.stroke_color, style.fill_alpha, style.stroke_alpha,
            style.shape, style.width, style.text_size, style.text_field, style.enabled, style.order, style.decimation,
        ],
    )
    .with_context(|| format!("[catalog::style] Failed to update style of {}", style.name))
}

impl SpatialDatabase {
    /// Get the style of a layer, or the default style when none is stored.
    pub fn style_for(&self, layer: &str) -> Result<Style> {
        if !table_exists(&self.conn, STYLE_TABLE)? {
            return Ok(Style::new(layer));
        }
        Ok(read_style(&self.conn, layer)?.unwrap_or_else(|| Style::new(layer)))
    }

    /// Overwrite the stored style of `style.name`.
    ///
    /// Returns false, changing nothing, when no row exists for that layer.
    /// The cached vector catalog picks up the change and is re-sorted.
    pub fn update_style(&mut self, style: &Style) -> Result<bool> {
        if !table_exists(&self.conn, STYLE_TABLE)? {
            return Ok(false);
        }
        if write_style(&self.conn, style)? == 0 {
            debug!(layer = %style.name, "no stored style to update");
            return Ok(false);
        }
        self.vectors.modify(|tables| {
            for table in tables.iter_mut().filter(|t| t.table_name == style.name) {
                table.style = style.clone();
            }
            tables.sort_by_key(|t| t.style.order);
        });
        Ok(true)
    }
}
