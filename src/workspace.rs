//! Features owned by a working session: the drawn layer and the imported layers.

use crate::geometry::{AttributeValue, Feature, FeatureId, Geometry};
use crate::projection::Crs;
use crate::{Error, Result};

use std::collections::HashMap;
use std::fmt;

/// Attribute names a label is taken from, in order of preference
const LABEL_ATTRIBUTES: [&str; 3] = ["label", "name", "nom"];

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct LayerId(pub u64);

impl fmt::Display for LayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// An imported layer, features already in the display CRS
#[derive(Clone, Debug)]
pub struct Layer {
    pub id: LayerId,
    pub name: String,
    /// the CRS the file was written in, kept only as metadata
    pub source_crs: Crs,
    pub features: Vec<Feature>,
}

/// What an export is run against
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ExportTarget {
    Feature(FeatureId),
    Layer(LayerId),
    AllDrawn,
}

#[derive(Debug, Default)]
pub struct Workspace {
    drawn: Vec<Feature>,
    layers: Vec<Layer>,
    next_feature: u64,
    next_layer: u64,
    // per geometry kind, for "Polygon 3" style labels
    label_counters: HashMap<&'static str, u64>,
}

fn label_from_attributes(feature: &Feature) -> Option<String> {
    LABEL_ATTRIBUTES
        .iter()
        .filter_map(|key| feature.attributes.get_ignore_case(key))
        .map(|value| value.to_string())
        .find(|label| !label.trim().is_empty())
}

impl Workspace {
    pub fn new() -> Self {
        Self::default()
    }

    fn assign_id(&mut self, feature: &mut Feature) -> FeatureId {
        self.next_feature += 1;
        let id = FeatureId(self.next_feature);
        feature.id = Some(id);
        id
    }

    fn assign_label(&mut self, feature: &mut Feature) {
        if feature.label.is_some() {
            return;
        }
        feature.label = Some(match label_from_attributes(feature) {
            Some(label) => label,
            None => {
                let kind = feature.geometry.kind_name();
                let counter = self.label_counters.entry(kind).or_insert(0);
                *counter += 1;
                format!("{kind} {counter}")
            }
        });
    }

    /// Stores a finished drawing and returns its identifier
    pub fn add_drawn(&mut self, mut feature: Feature) -> Result<FeatureId> {
        feature.geometry.validate()?;
        let id = self.assign_id(&mut feature);
        self.assign_label(&mut feature);
        log::debug!("drawn feature {id} added as {:?}", feature.label);
        self.drawn.push(feature);
        Ok(id)
    }

    pub fn drawn(&self) -> &[Feature] {
        &self.drawn
    }

    /// Looks a feature up in the drawn layer and every imported layer
    pub fn feature(&self, id: FeatureId) -> Result<&Feature> {
        self.drawn
            .iter()
            .chain(self.layers.iter().flat_map(|l| l.features.iter()))
            .find(|f| f.id == Some(id))
            .ok_or(Error::UnknownFeature(id))
    }

    fn feature_mut(&mut self, id: FeatureId) -> Result<&mut Feature> {
        self.drawn
            .iter_mut()
            .chain(self.layers.iter_mut().flat_map(|l| l.features.iter_mut()))
            .find(|f| f.id == Some(id))
            .ok_or(Error::UnknownFeature(id))
    }

    /// Replaces the geometry of a feature, keeping its identifier and attributes
    pub fn modify_geometry(&mut self, id: FeatureId, geometry: Geometry) -> Result<()> {
        geometry.validate()?;
        self.feature_mut(id)?.geometry = geometry;
        Ok(())
    }

    pub fn set_attribute(
        &mut self,
        id: FeatureId,
        key: impl Into<String>,
        value: impl Into<AttributeValue>,
    ) -> Result<()> {
        self.feature_mut(id)?.attributes.insert(key, value);
        Ok(())
    }

    pub fn set_label(&mut self, id: FeatureId, label: impl Into<String>) -> Result<()> {
        self.feature_mut(id)?.label = Some(label.into());
        Ok(())
    }

    pub fn delete(&mut self, id: FeatureId) -> Result<Feature> {
        if let Some(index) = self.drawn.iter().position(|f| f.id == Some(id)) {
            return Ok(self.drawn.remove(index));
        }
        for layer in self.layers.iter_mut() {
            if let Some(index) = layer.features.iter().position(|f| f.id == Some(id)) {
                return Ok(layer.features.remove(index));
            }
        }
        Err(Error::UnknownFeature(id))
    }

    /// Drops every drawn feature and imported layer
    pub fn reset(&mut self) {
        log::info!(
            "Workspace reset, dropping {} drawn features and {} layers",
            self.drawn.len(),
            self.layers.len()
        );
        // identifiers stay unique for the whole session
        *self = Workspace {
            next_feature: self.next_feature,
            next_layer: self.next_layer,
            ..Workspace::default()
        };
    }

    pub fn add_layer(
        &mut self,
        name: impl Into<String>,
        source_crs: Crs,
        features: Vec<Feature>,
    ) -> LayerId {
        self.next_layer += 1;
        let id = LayerId(self.next_layer);

        let mut layer = Layer {
            id,
            name: name.into(),
            source_crs,
            features: Vec::with_capacity(features.len()),
        };
        for mut feature in features {
            self.assign_id(&mut feature);
            if feature.label.is_none() {
                feature.label = label_from_attributes(&feature);
            }
            layer.features.push(feature);
        }

        log::info!(
            "Layer {id} \"{}\" added with {} features from {}",
            layer.name,
            layer.features.len(),
            layer.source_crs.code
        );
        self.layers.push(layer);
        id
    }

    pub fn layer(&self, id: LayerId) -> Result<&Layer> {
        self.layers
            .iter()
            .find(|l| l.id == id)
            .ok_or(Error::UnknownLayer(id))
    }

    pub fn remove_layer(&mut self, id: LayerId) -> Result<Layer> {
        let index = self
            .layers
            .iter()
            .position(|l| l.id == id)
            .ok_or(Error::UnknownLayer(id))?;
        Ok(self.layers.remove(index))
    }

    pub fn layers(&self) -> &[Layer] {
        &self.layers
    }

    /// Features an export of `target` covers, never empty
    pub fn target_features(&self, target: &ExportTarget) -> Result<Vec<&Feature>> {
        let features: Vec<&Feature> = match target {
            ExportTarget::Feature(id) => vec![self.feature(*id)?],
            ExportTarget::Layer(id) => self.layer(*id)?.features.iter().collect(),
            ExportTarget::AllDrawn => self.drawn.iter().collect(),
        };

        if features.is_empty() {
            return Err(Error::EmptySelection);
        }
        Ok(features)
    }
}
