//! A layer's geometry, accessors and attribute columns assembled into one row-aligned table.

use std::collections::HashMap;
use std::sync::Arc;

use arrow_array::{ArrayRef, RecordBatch};
use arrow_schema::{Field, Schema};
use geo::Geometry;
use indexmap::IndexMap;

use crate::accessor::{array_nbytes, Accessor, AccessorInput};
use crate::algorithm::auto_downcast;
use crate::array::GeometryColumn;
use crate::chunk::{plan, ChunkPolicy};
use crate::crs::{default_transform, Crs};
use crate::encode::encode_with_crs;
use crate::error::{LayerError, Result};
use crate::options::SerializationOptions;
use crate::schema::LayerKind;

/// Name of the geometry column in assembled record batches.
pub const GEOMETRY_COLUMN_NAME: &str = "geometry";

/// Field metadata key marking a per-row accessor column; the value is the accessor kind.
pub const ACCESSOR_KIND_KEY: &str = "geoarrow_layer:accessor";

/// Schema metadata key holding constant accessors as a JSON object of name to value.
pub const CONSTANT_ACCESSORS_KEY: &str = "geoarrow_layer:constant_accessors";

/// In-memory feature data: one optional geometry per row, its CRS, and attribute columns.
#[derive(Debug, Clone, Default)]
pub struct GeoFrame {
    pub geometry: Vec<Option<Geometry>>,
    pub crs: Option<Crs>,
    pub properties: Option<RecordBatch>,
}

impl GeoFrame {
    pub fn new(geometry: Vec<Option<Geometry>>) -> Self {
        Self {
            geometry,
            ..Default::default()
        }
    }

    pub fn with_crs(self, crs: impl Into<Crs>) -> Self {
        Self {
            crs: Some(crs.into()),
            ..self
        }
    }

    pub fn with_properties(self, properties: RecordBatch) -> Self {
        Self {
            properties: Some(properties),
            ..self
        }
    }

    pub fn len(&self) -> usize {
        self.geometry.len()
    }

    pub fn is_empty(&self) -> bool {
        self.geometry.is_empty()
    }
}

/// A geometry column plus the accessors and attribute columns of one layer.
///
/// Every per-row accessor and the attribute batch have exactly one value per geometry. Tables
/// are immutable; [`LayerTable::set_accessor`] returns a new table.
#[derive(Debug, Clone)]
pub struct LayerTable {
    kind: LayerKind,
    geometry: GeometryColumn,
    accessors: IndexMap<String, Accessor>,
    properties: Option<RecordBatch>,
}

impl LayerTable {
    /// Assemble a table, resolving and validating every accessor against the layer schema.
    ///
    /// # Errors
    ///
    /// - [`LayerError::UnknownField`] naming every accessor the layer kind does not declare
    /// - [`LayerError::UnsupportedGeometry`] if the layer kind cannot draw the geometry type
    /// - [`LayerError::LengthMismatch`] if a per-row accessor or the attribute batch does not have
    ///   one value per geometry
    /// - [`LayerError::IncorrectType`] or [`LayerError::InvalidRange`] for invalid accessor values
    pub fn try_new(
        kind: LayerKind,
        geometry: GeometryColumn,
        accessors: IndexMap<String, AccessorInput>,
        properties: Option<RecordBatch>,
    ) -> Result<Self> {
        let unknown: Vec<String> = accessors
            .keys()
            .filter(|name| kind.field(name).is_none())
            .cloned()
            .collect();
        if !unknown.is_empty() {
            return Err(LayerError::UnknownField(unknown));
        }

        if !kind.allows(geometry.geometry_type()) {
            return Err(LayerError::UnsupportedGeometry(format!(
                "{} cannot render {} geometries",
                kind,
                geometry.geometry_type()
            )));
        }

        let row_count = geometry.len();
        if let Some(batch) = &properties {
            check_length("properties", row_count, batch.num_rows())?;
            let schema = batch.schema();
            let reserved = schema.fields().iter().map(|f| f.name()).find(|name| {
                name.as_str() == GEOMETRY_COLUMN_NAME || kind.field(name).is_some()
            });
            if let Some(name) = reserved {
                return Err(LayerError::General(format!(
                    "property column name {:?} is reserved for {}",
                    name,
                    if name.as_str() == GEOMETRY_COLUMN_NAME {
                        "the geometry column".to_string()
                    } else {
                        format!("an accessor of {}", kind)
                    }
                )));
            }
        }

        let accessors = accessors
            .iter()
            .map(|(name, input)| -> Result<(String, Accessor)> {
                Ok((name.clone(), resolve(kind, row_count, name, input)?))
            })
            .collect::<Result<IndexMap<_, _>>>()?;

        Ok(Self {
            kind,
            geometry,
            accessors,
            properties,
        })
    }

    /// Encode a [`GeoFrame`] and assemble it into a table for the given layer kind.
    ///
    /// Geometries are transformed to longitude/latitude when the frame declares another CRS.
    /// With `auto_downcast` set, numeric attribute columns are narrowed where lossless.
    pub fn from_geo_frame(
        kind: LayerKind,
        frame: &GeoFrame,
        accessors: IndexMap<String, AccessorInput>,
        options: &SerializationOptions,
    ) -> Result<Self> {
        let transform = default_transform();
        let geometry = encode_with_crs(
            &frame.geometry,
            kind.allowed_geometry_types(),
            frame.crs.as_ref(),
            transform.as_ref(),
        )?;
        let properties = match &frame.properties {
            Some(batch) if options.auto_downcast => Some(auto_downcast(batch)?),
            other => other.clone(),
        };
        Self::try_new(kind, geometry, accessors, properties)
    }

    /// A new table with the accessor `name` replaced by `input`; `self` is left unchanged.
    pub fn set_accessor(&self, name: &str, input: impl Into<AccessorInput>) -> Result<Self> {
        if self.kind.field(name).is_none() {
            return Err(LayerError::UnknownField(vec![name.to_string()]));
        }
        let accessor = resolve(self.kind, self.len(), name, &input.into())?;
        let mut table = self.clone();
        table.accessors.insert(name.to_string(), accessor);
        Ok(table)
    }

    pub fn kind(&self) -> LayerKind {
        self.kind
    }

    pub fn geometry(&self) -> &GeometryColumn {
        &self.geometry
    }

    /// The accessors supplied by the caller, in the order given.
    pub fn accessors(&self) -> &IndexMap<String, Accessor> {
        &self.accessors
    }

    /// The accessor for `name`, falling back to the schema default.
    ///
    /// Returns `None` if the layer kind has no such field.
    pub fn accessor(&self, name: &str) -> Option<Accessor> {
        match self.accessors.get(name) {
            Some(accessor) => Some(accessor.clone()),
            None => self
                .kind
                .field(name)
                .map(|field| Accessor::Constant(field.default)),
        }
    }

    pub fn properties(&self) -> Option<&RecordBatch> {
        self.properties.as_ref()
    }

    /// Number of rows
    pub fn len(&self) -> usize {
        self.geometry.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Total encoded size: geometry buffers, per-row accessors and attribute columns.
    pub fn nbytes(&self) -> Result<usize> {
        let mut total = self.geometry.nbytes();
        for accessor in self.accessors.values() {
            total += accessor.nbytes()?;
        }
        if let Some(batch) = &self.properties {
            for column in batch.columns() {
                total += array_nbytes(&column.to_data())?;
            }
        }
        Ok(total)
    }

    /// Attribute columns, then per-row accessor columns, then the geometry column tagged with
    /// its GeoArrow extension type. Constant accessors are stored in the schema metadata under
    /// [`CONSTANT_ACCESSORS_KEY`].
    pub fn to_record_batch(&self) -> Result<RecordBatch> {
        assemble_batch(&self.geometry, &self.accessors, self.properties.as_ref())
    }

    /// Rows per chunk under this layer kind's chunk policy.
    pub fn rows_per_chunk(&self, options: &SerializationOptions) -> Result<usize> {
        match self.kind.chunk_policy() {
            ChunkPolicy::WholeTable => Ok(self.len().max(1)),
            ChunkPolicy::ByteBudget => plan(self, options.max_chunk_bytes),
        }
    }
}

fn check_length(field: &str, expected: usize, actual: usize) -> Result<()> {
    if expected != actual {
        return Err(LayerError::LengthMismatch {
            field: field.to_string(),
            expected,
            actual,
        });
    }
    Ok(())
}

fn resolve(kind: LayerKind, row_count: usize, name: &str, input: &AccessorInput) -> Result<Accessor> {
    let field = kind
        .field(name)
        .ok_or_else(|| LayerError::UnknownField(vec![name.to_string()]))?;
    let accessor = input.resolve(name, field.kind)?;
    if let Some(len) = accessor.len() {
        check_length(name, row_count, len)?;
    }
    Ok(accessor)
}

pub(crate) fn assemble_batch(
    geometry: &GeometryColumn,
    accessors: &IndexMap<String, Accessor>,
    properties: Option<&RecordBatch>,
) -> Result<RecordBatch> {
    let mut fields: Vec<Arc<Field>> = Vec::new();
    let mut columns: Vec<ArrayRef> = Vec::new();
    let mut metadata: HashMap<String, String> = Default::default();
    if let Some(batch) = properties {
        let schema = batch.schema();
        fields.extend(schema.fields().iter().cloned());
        columns.extend(batch.columns().iter().cloned());
        metadata = schema.metadata().clone();
    }

    let mut constants = IndexMap::new();
    for (name, accessor) in accessors {
        match accessor {
            Accessor::Constant(value) => {
                constants.insert(name.as_str(), *value);
            }
            Accessor::PerRow(array) => {
                let field = Field::new(name, array.data_type().clone(), false).with_metadata(
                    HashMap::from([(
                        ACCESSOR_KIND_KEY.to_string(),
                        accessor.kind().as_str().to_string(),
                    )]),
                );
                fields.push(Arc::new(field));
                columns.push(array.clone());
            }
        }
    }
    if !constants.is_empty() {
        metadata.insert(
            CONSTANT_ACCESSORS_KEY.to_string(),
            serde_json::to_string(&constants)?,
        );
    }

    fields.push(Arc::new(geometry.extension_field(GEOMETRY_COLUMN_NAME)?));
    columns.push(geometry.to_array_ref());

    let schema = Arc::new(Schema::new_with_metadata(fields, metadata));
    Ok(RecordBatch::try_new(schema, columns)?)
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::accessor::ScalarValue;
    use crate::array::GeometryBuilder;
    use crate::datatypes::GeometryType;
    use crate::test::{point, polygon, properties};
    use arrow_array::Array;
    use arrow_schema::DataType;
    use indexmap::indexmap;

    fn two_points() -> GeometryColumn {
        let mut builder = GeometryBuilder::new(GeometryType::Point);
        builder.push_point(&point::p0()).unwrap();
        builder.push_point(&point::p1()).unwrap();
        builder.finish().unwrap()
    }

    #[test]
    fn radius_length_must_match_rows() {
        let ok = LayerTable::try_new(
            LayerKind::Scatterplot,
            two_points(),
            indexmap! { "get_radius".to_string() => AccessorInput::floats(vec![1.0, 2.0]) },
            None,
        );
        assert!(ok.is_ok());

        for radius in [vec![1.0], vec![1.0, 2.0, 3.0]] {
            let actual = radius.len();
            let err = LayerTable::try_new(
                LayerKind::Scatterplot,
                two_points(),
                indexmap! { "get_radius".to_string() => AccessorInput::floats(radius) },
                None,
            )
            .unwrap_err();
            match err {
                LayerError::LengthMismatch {
                    field,
                    expected,
                    actual: got,
                } => {
                    assert_eq!(field, "get_radius");
                    assert_eq!(expected, 2);
                    assert_eq!(got, actual);
                }
                other => panic!("unexpected error {other}"),
            }
        }
    }

    #[test]
    fn constants_skip_length_check() {
        let table = LayerTable::try_new(
            LayerKind::Scatterplot,
            two_points(),
            indexmap! { "get_radius".to_string() => AccessorInput::float(5.0) },
            None,
        )
        .unwrap();
        assert_eq!(
            table.accessor("get_radius").unwrap(),
            Accessor::Constant(ScalarValue::Float(5.0))
        );
    }

    #[test]
    fn unknown_accessor_names() {
        let err = LayerTable::try_new(
            LayerKind::Scatterplot,
            two_points(),
            indexmap! {
                "get_unicorn".to_string() => AccessorInput::float(1.0),
                "get_radius".to_string() => AccessorInput::float(1.0),
                "get_width".to_string() => AccessorInput::float(1.0),
            },
            None,
        )
        .unwrap_err();
        match err {
            LayerError::UnknownField(names) => {
                assert_eq!(names, vec!["get_unicorn", "get_width"]);
            }
            other => panic!("unexpected error {other}"),
        }
    }

    #[test]
    fn geometry_type_must_suit_layer() {
        let err = LayerTable::try_new(
            LayerKind::Path,
            two_points(),
            IndexMap::new(),
            None,
        )
        .unwrap_err();
        assert!(matches!(err, LayerError::UnsupportedGeometry(_)));

        let polygons = polygon::polygon_column();
        assert!(LayerTable::try_new(LayerKind::SolidPolygon, polygons, IndexMap::new(), None).is_ok());
    }

    #[test]
    fn property_rows_must_match() {
        let err = LayerTable::try_new(
            LayerKind::Scatterplot,
            two_points(),
            IndexMap::new(),
            Some(properties::numeric_batch()),
        )
        .unwrap_err();
        assert!(matches!(err, LayerError::LengthMismatch { .. }));
    }

    #[test]
    fn defaults_and_set_accessor() {
        let table =
            LayerTable::try_new(LayerKind::Scatterplot, two_points(), IndexMap::new(), None).unwrap();
        assert_eq!(
            table.accessor("get_fill_color").unwrap(),
            Accessor::Constant(ScalarValue::Color([0, 0, 0, 255]))
        );
        assert!(table.accessor("get_unicorn").is_none());

        let updated = table
            .set_accessor("get_fill_color", AccessorInput::colors([[255, 0, 0], [0, 255, 0]]))
            .unwrap();
        assert_eq!(updated.accessor("get_fill_color").unwrap().len(), Some(2));
        assert!(table.accessors().is_empty());

        let err = table
            .set_accessor("get_radius", vec![1.0, 2.0, 3.0])
            .unwrap_err();
        assert!(matches!(err, LayerError::LengthMismatch { .. }));
        let err = table.set_accessor("get_unicorn", 1.0).unwrap_err();
        assert!(matches!(err, LayerError::UnknownField(_)));
    }

    #[test]
    fn nbytes_counts_every_column() {
        let geometry = point::point_column();
        let table = LayerTable::try_new(
            LayerKind::Scatterplot,
            geometry.clone(),
            indexmap! {
                "get_radius".to_string() => AccessorInput::floats(vec![1.0, 2.0, 3.0]),
                "get_line_width".to_string() => AccessorInput::float(2.0),
            },
            Some(properties::numeric_batch()),
        )
        .unwrap();
        let properties: usize = properties::numeric_batch()
            .columns()
            .iter()
            .map(|column| column.to_data().get_slice_memory_size().unwrap())
            .sum();
        assert_eq!(
            table.nbytes().unwrap(),
            geometry.nbytes() + 3 * 4 + properties
        );
    }

    #[test]
    fn record_batch_carries_extension_type() {
        let table = LayerTable::try_new(
            LayerKind::Scatterplot,
            point::point_column(),
            IndexMap::new(),
            Some(properties::numeric_batch()),
        )
        .unwrap();
        let batch = table.to_record_batch().unwrap();
        assert_eq!(batch.num_rows(), 3);
        let schema = batch.schema();
        let field = schema.field_with_name(GEOMETRY_COLUMN_NAME).unwrap();
        assert_eq!(
            field
                .metadata()
                .get("ARROW:extension:name")
                .map(String::as_str),
            Some("geoarrow.point")
        );
        assert_eq!(batch.column(batch.num_columns() - 1).len(), 3);
    }

    #[test]
    fn record_batch_holds_accessors() {
        let table = LayerTable::try_new(
            LayerKind::Scatterplot,
            point::point_column(),
            indexmap! {
                "get_fill_color".to_string() => AccessorInput::colors([[1, 2, 3], [4, 5, 6], [7, 8, 9]]),
                "get_radius".to_string() => AccessorInput::floats(vec![1.0, 2.0, 3.0]),
                "get_line_width".to_string() => AccessorInput::float(2.5),
            },
            Some(properties::numeric_batch()),
        )
        .unwrap();
        let batch = table.to_record_batch().unwrap();
        let schema = batch.schema();
        let names: Vec<&str> = schema.fields().iter().map(|f| f.name().as_str()).collect();
        let n = names.len();
        assert_eq!(
            &names[n - 3..],
            &["get_fill_color", "get_radius", GEOMETRY_COLUMN_NAME]
        );

        let radius = schema.field_with_name("get_radius").unwrap();
        assert_eq!(radius.data_type(), &DataType::Float32);
        assert_eq!(
            radius.metadata().get(ACCESSOR_KIND_KEY).map(String::as_str),
            Some("float")
        );
        let color = schema.field_with_name("get_fill_color").unwrap();
        assert_eq!(
            color.metadata().get(ACCESSOR_KIND_KEY).map(String::as_str),
            Some("color")
        );
        assert!(schema.field_with_name("get_line_width").is_err());

        let constants = schema.metadata().get(CONSTANT_ACCESSORS_KEY).unwrap();
        let constants: IndexMap<String, ScalarValue> = serde_json::from_str(constants).unwrap();
        assert_eq!(constants["get_line_width"], ScalarValue::Float(2.5));
        assert_eq!(constants.len(), 1);
    }

    #[test]
    fn property_named_like_accessor_is_rejected() {
        let radius = Arc::new(arrow_array::Float64Array::from(vec![1.0, 2.0])) as ArrayRef;
        let batch = RecordBatch::try_from_iter([("get_radius", radius)]).unwrap();
        let err = LayerTable::try_new(
            LayerKind::Scatterplot,
            two_points(),
            IndexMap::new(),
            Some(batch),
        )
        .unwrap_err();
        assert!(matches!(err, LayerError::General(_)));

        let id = Arc::new(arrow_array::UInt32Array::from(vec![0, 1])) as ArrayRef;
        let batch = RecordBatch::try_from_iter([(GEOMETRY_COLUMN_NAME, id)]).unwrap();
        let err = LayerTable::try_new(
            LayerKind::Scatterplot,
            two_points(),
            IndexMap::new(),
            Some(batch),
        )
        .unwrap_err();
        assert!(matches!(err, LayerError::General(_)));
    }

    #[test]
    fn heatmap_is_one_chunk() {
        let table =
            LayerTable::try_new(LayerKind::Heatmap, point::point_column(), IndexMap::new(), None)
                .unwrap();
        let options = SerializationOptions {
            max_chunk_bytes: 1,
            ..Default::default()
        };
        assert_eq!(table.rows_per_chunk(&options).unwrap(), 3);

        let table = LayerTable::try_new(
            LayerKind::Scatterplot,
            point::point_column(),
            IndexMap::new(),
            None,
        )
        .unwrap();
        assert_eq!(table.rows_per_chunk(&options).unwrap(), 1);
    }

    #[test]
    fn from_geo_frame_downcasts_properties() {
        let frame = GeoFrame::new(point::point_column().iter_geo().collect())
            .with_crs("EPSG:4326")
            .with_properties(properties::numeric_batch());
        let table = LayerTable::from_geo_frame(
            LayerKind::Scatterplot,
            &frame,
            IndexMap::new(),
            &SerializationOptions::default(),
        )
        .unwrap();
        let properties = table.properties().unwrap();
        assert_eq!(
            properties.schema().field(0).data_type(),
            &arrow_schema::DataType::Int8
        );
        assert_eq!(table.geometry().coords(), point::point_column().coords());
        assert!(table.geometry().metadata().crs.is_some());

        let table = LayerTable::from_geo_frame(
            LayerKind::Scatterplot,
            &frame,
            IndexMap::new(),
            &SerializationOptions {
                auto_downcast: false,
                ..Default::default()
            },
        )
        .unwrap();
        assert_eq!(
            table.properties().unwrap().schema().field(0).data_type(),
            &arrow_schema::DataType::Int64
        );
    }
}
