//! Exchange document: the JSON form of a whole graph.
//!
//! ```text
//! { "cells": [...], "cellLayers": [{"id": ...}], "defaultCellLayer": id, ...attributes }
//! ```
//!
//! Loading applies layers first, then cells through
//! [`Graph::reset_cells`]. Top-level keys other than the three above are
//! graph attributes and round-trip untouched.

use std::io::Write;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::graph::Graph;
use crate::model::*;
use crate::{Error, Result};

/// A layer entry of the document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LayerEntry {
    pub id: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GraphDocument {
    pub cells: Vec<PropertyMap>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cell_layers: Option<Vec<LayerEntry>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_cell_layer: Option<String>,
    #[serde(flatten)]
    pub attributes: PropertyMap,
}

impl GraphDocument {
    /// Parse a document, requiring an object with a `cells` array.
    pub fn from_json(json: serde_json::Value) -> Result<Self> {
        let Some(object) = json.as_object() else {
            return Err(Error::InvalidDocument("document must be an object".into()));
        };
        if !object.get("cells").is_some_and(serde_json::Value::is_array) {
            return Err(Error::InvalidDocument("document is missing its cells array".into()));
        }
        Ok(serde_json::from_value(json)?)
    }
}

impl Graph {
    pub fn to_document(&self) -> GraphDocument {
        GraphDocument {
            cells: self.cells().iter().map(Cell::to_attributes).collect(),
            cell_layers: Some(
                self.layers()
                    .iter()
                    .map(|id| LayerEntry { id: id.to_owned() })
                    .collect(),
            ),
            default_cell_layer: Some(self.layers().default_layer().to_owned()),
            attributes: self.attributes().clone(),
        }
    }

    pub fn to_json(&self) -> Result<serde_json::Value> {
        Ok(serde_json::to_value(self.to_document())?)
    }

    /// Pretty-printed document into `writer`.
    pub fn write_json(&self, writer: &mut dyn Write) -> Result<()> {
        serde_json::to_writer_pretty(&mut *writer, &self.to_document())?;
        writeln!(writer)?;
        Ok(())
    }

    /// Replace the graph content with a document.
    pub fn load_document(&mut self, document: GraphDocument) -> Result<()> {
        let cells = document
            .cells
            .into_iter()
            .map(Cell::from_attributes)
            .collect::<Result<Vec<_>>>()?;

        for layer in document.cell_layers.into_iter().flatten() {
            self.add_layer(layer.id);
        }
        if let Some(default) = document.default_cell_layer {
            self.set_default_layer(default);
        }
        for (key, value) in document.attributes {
            self.set_graph_attribute(key, value);
        }

        debug!(cells = cells.len(), "loading document");
        self.reset_cells(cells)
    }

    /// Replace the graph content with a JSON document.
    pub fn load_json(&mut self, json: serde_json::Value) -> Result<()> {
        self.load_document(GraphDocument::from_json(json)?)
    }

    /// A fresh graph with the default configuration, loaded from `json`.
    pub fn from_json(json: serde_json::Value) -> Result<Self> {
        let mut graph = Graph::new();
        graph.load_json(json)?;
        Ok(graph)
    }

    pub fn from_json_str(json: &str) -> Result<Self> {
        Self::from_json(serde_json::from_str(json)?)
    }
}
