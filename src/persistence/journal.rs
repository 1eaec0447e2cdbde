//! Filesystem journal
//!
//! Mirrors each committed graph mutation onto a `DiskLayout`. The in-memory
//! change has already happened when `record` runs; a failure here leaves the
//! tree behind the store until the graph is reopened from disk.

use super::layout::{validate_name, DiskLayout};
use super::StorageResult;
use crate::graph::{GraphEvent, GraphJournal, IdWatermark, Label};
use tracing::debug;

#[derive(Debug)]
pub struct FsJournal {
    layout: DiskLayout,
    /// Last watermark written to the header
    watermark: IdWatermark,
}

impl FsJournal {
    pub fn new(layout: DiskLayout, watermark: IdWatermark) -> Self {
        Self { layout, watermark }
    }

    pub fn layout(&self) -> &DiskLayout {
        &self.layout
    }

    /// The header goes first so an identity is never handed out twice, even
    /// if the entity directory below it is never written.
    fn advance(&mut self, watermark: IdWatermark) -> StorageResult<()> {
        if watermark != self.watermark {
            self.layout.write_header(watermark)?;
            self.watermark = watermark;
        }
        Ok(())
    }
}

impl GraphJournal for FsJournal {
    fn admit_label(&self, label: &Label) -> StorageResult<()> {
        validate_name(label.as_str())
    }

    fn record(&mut self, event: &GraphEvent<'_>) -> StorageResult<()> {
        match *event {
            GraphEvent::ConstraintAdded { all, .. } => {
                self.layout.write_constraints(all)?;
            }
            GraphEvent::VertexCreated { vertex, watermark } => {
                self.advance(watermark)?;
                self.layout.create_vertex(vertex)?;
            }
            GraphEvent::EdgeCreated {
                edge,
                head,
                tail,
                watermark,
            } => {
                self.advance(watermark)?;
                self.layout.create_edge(edge, head, tail)?;
            }
            GraphEvent::VertexPropertiesSet { vertex } => {
                self.layout.write_vertex_properties(vertex)?;
            }
            GraphEvent::EdgePropertiesSet { edge } => {
                self.layout.write_edge_properties(edge)?;
            }
            GraphEvent::VertexRemoved { vertex } => {
                self.layout.remove_vertex(vertex)?;
            }
            GraphEvent::EdgeRemoved { edge, head, tail } => {
                self.layout.remove_edge(edge, head, tail)?;
            }
        }
        debug!("Journaled {} under {:?}", event.kind(), self.layout.root());
        Ok(())
    }

    fn flush(&mut self) -> StorageResult<()> {
        self.layout.write_header(self.watermark)
    }
}
