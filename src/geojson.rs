use geo::Coord;
use geojson::{feature::Id, Feature, FeatureCollection, Geometry, Value};
use itertools::Itertools as _;
use serde_json::{json, Map, Value as JsonValue};
use tracing::debug;

use crate::{
    asr::Asr,
    coordinate::CoordinateError,
    ese::Ese,
    sct::{Geo, Sct},
    Color, Coordinate,
};

/// Output coordinate system of the exported features.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Projection {
    /// Spherical mercator metres
    #[default]
    Mercator,
    /// Decimal degrees rounded to 6 places
    Wgs84,
}

impl Projection {
    fn project(self, coordinate: &Coordinate) -> Result<Vec<f64>, CoordinateError> {
        let Coord { x, y } = match self {
            Self::Mercator => coordinate.to_utm()?,
            Self::Wgs84 => coordinate.to_wgs84()?,
        };
        Ok(vec![x, y])
    }
}

fn rgb(color: &Color) -> JsonValue {
    let (r, g, b) = color.to_rgb();
    json!([r, g, b])
}

fn feature(geometry: Value, properties: Vec<(&str, JsonValue)>) -> Feature {
    Feature {
        geometry: Some(Geometry::new(geometry)),
        properties: Some(
            properties
                .into_iter()
                .map(|(key, value)| (key.to_string(), value))
                .collect::<Map<_, _>>(),
        ),
        ..Default::default()
    }
}

/// `true` without a selection, otherwise only for listed ids.
fn selected(selection: Option<&Vec<String>>, id: &str) -> bool {
    selection.map_or(true, |ids| ids.iter().any(|selected| selected == id))
}

fn geo_features(
    groups: &[Geo],
    kind: &str,
    selection: Option<&Vec<String>>,
    projection: Projection,
) -> Result<Vec<Feature>, CoordinateError> {
    let mut features = vec![];
    for geo in groups.iter().filter(|geo| selected(selection, &geo.id)) {
        for segment in &geo.segments {
            let mut properties = vec![("type", kind.into()), ("section", geo.id.as_str().into())];
            if let Some(color) = &segment.color {
                properties.push(("color", rgb(color)));
            }
            features.push(feature(
                Value::LineString(vec![
                    projection.project(segment.start.coordinate())?,
                    projection.project(segment.end.coordinate())?,
                ]),
                properties,
            ));
        }
    }
    Ok(features)
}

fn point_features<'a, T: 'a>(
    items: impl IntoIterator<Item = &'a T>,
    selection: Option<&Vec<String>>,
    projection: Projection,
    fields: impl Fn(&T) -> (&str, &Coordinate, Vec<(&'static str, JsonValue)>),
) -> Result<Vec<Feature>, CoordinateError> {
    items
        .into_iter()
        .filter_map(|item| {
            let (id, coordinate, properties) = fields(item);
            selected(selection, id).then(|| {
                Ok(feature(
                    Value::Point(projection.project(coordinate)?),
                    properties,
                ))
            })
        })
        .collect()
}

/// Maps a parsed sector file (plus optional free texts and display
/// selection) onto GeoJSON features.
pub fn to_feature_collection(
    sct: &Sct,
    ese: Option<&Ese>,
    asr: Option<&Asr>,
    projection: Projection,
) -> Result<FeatureCollection, CoordinateError> {
    let mut features = vec![];

    for region in sct
        .regions
        .iter()
        .filter(|region| selected(asr.map(|asr| &asr.regions), &region.id))
    {
        for polygon in &region.polygons {
            let ring = polygon
                .points
                .iter()
                .map(|point| projection.project(point))
                .collect::<Result<Vec<_>, _>>()?;
            features.push(feature(
                Value::Polygon(vec![ring]),
                vec![
                    ("type", "region".into()),
                    ("region", region.id.as_str().into()),
                    ("color", rgb(&polygon.color)),
                ],
            ));
        }
    }

    for (groups, kind, selection) in [
        (&sct.geo, "geo", asr.map(|asr| &asr.geo)),
        (&sct.artcc, "artcc", asr.map(|asr| &asr.artcc)),
        (&sct.artcc_low, "artcc-low", asr.map(|asr| &asr.artcc_low)),
        (&sct.artcc_high, "artcc-high", asr.map(|asr| &asr.artcc_high)),
    ] {
        features.extend(geo_features(groups, kind, selection, projection)?);
    }

    features.extend(point_features(
        &sct.airports,
        asr.map(|asr| &asr.airports),
        projection,
        |airport| {
            (
                airport.designator.as_str(),
                &airport.coordinate,
                vec![
                    ("type", "airport".into()),
                    ("name", airport.designator.as_str().into()),
                ],
            )
        },
    )?);

    for runway in sct.runways.iter().filter(|runway| {
        asr.map_or(true, |asr| {
            let full_name = format!(
                "{} {} {}-{}",
                runway.aerodrome,
                runway.aerodrome_name.as_deref().unwrap_or_default(),
                runway.designators.0,
                runway.designators.1
            );
            asr.runways.contains_key(&full_name)
        })
    }) {
        let mut properties = vec![
            ("type", "runway".into()),
            ("name", runway.designators.0.as_str().into()),
            ("oppositeId", runway.designators.1.as_str().into()),
            ("icao", runway.aerodrome.as_str().into()),
        ];
        if let Some(name) = &runway.aerodrome_name {
            properties.push(("airport", name.as_str().into()));
        }
        let mut runway_feature = feature(
            Value::LineString(vec![
                projection.project(&runway.location.0)?,
                projection.project(&runway.location.1)?,
            ]),
            properties,
        );
        runway_feature.id = Some(Id::String(format!(
            "{}: {}",
            runway.aerodrome, runway.designators.0
        )));
        features.push(runway_feature);
    }

    features.extend(point_features(
        &sct.vors,
        asr.map(|asr| &asr.vors),
        projection,
        |vor| {
            (
                vor.designator.as_str(),
                &vor.coordinate,
                vec![
                    ("type", "vor".into()),
                    ("name", vor.designator.as_str().into()),
                    ("freq", vor.frequency.as_str().into()),
                ],
            )
        },
    )?);
    features.extend(point_features(
        &sct.ndbs,
        asr.map(|asr| &asr.ndbs),
        projection,
        |ndb| {
            (
                ndb.designator.as_str(),
                &ndb.coordinate,
                vec![
                    ("type", "ndb".into()),
                    ("name", ndb.designator.as_str().into()),
                    ("freq", ndb.frequency.as_str().into()),
                ],
            )
        },
    )?);
    features.extend(point_features(
        &sct.fixes,
        asr.map(|asr| &asr.fixes),
        projection,
        |fix| {
            (
                fix.designator.as_str(),
                &fix.coordinate,
                vec![
                    ("type", "fix".into()),
                    ("name", fix.designator.as_str().into()),
                ],
            )
        },
    )?);

    for (groups, kind, selection) in [
        (&sct.sids, "sid", asr.map(|asr| &asr.sids)),
        (&sct.stars, "star", asr.map(|asr| &asr.stars)),
        (&sct.high_airways, "high-airway", asr.map(|asr| &asr.high_airways)),
        (&sct.low_airways, "low-airway", asr.map(|asr| &asr.low_airways)),
    ] {
        features.extend(geo_features(groups, kind, selection, projection)?);
    }

    features.extend(point_features(&sct.labels, None, projection, |label| {
        (
            label.text.as_str(),
            &label.coordinate,
            vec![
                ("type", "label".into()),
                ("value", label.text.as_str().into()),
                ("color", rgb(&label.color)),
            ],
        )
    })?);

    if let Some(ese) = ese {
        for (section, free_texts) in ese
            .free_text
            .iter_all()
            .sorted_by_key(|(section, _)| *section)
        {
            let shown = asr.map(|asr| asr.free_text.get_vec(section));
            for free_text in free_texts {
                let visible = match shown {
                    None => true,
                    Some(labels) => labels.is_some_and(|labels| labels.contains(&free_text.text)),
                };
                if !visible {
                    continue;
                }
                features.push(feature(
                    Value::Point(projection.project(&free_text.coordinate)?),
                    vec![
                        ("type", "label".into()),
                        ("section", section.as_str().into()),
                        ("value", free_text.text.as_str().into()),
                    ],
                ));
            }
        }
    }

    debug!("exported {} features", features.len());
    Ok(FeatureCollection::from_iter(features))
}

#[cfg(test)]
mod test {
    use multimap::MultiMap;
    use serde_json::json;

    use crate::{
        asr::Asr,
        ese::{Ese, FreeText},
        sct::{Geo, Polygon, Region, Runway, Sct, Segment, VOR},
        Color, Coordinate, Location, Waypoint,
    };

    use super::{to_feature_collection, Projection};

    fn empty_sct() -> Sct {
        Sct::parse(b"").unwrap()
    }

    fn waypoint(designator: &str, lat: &str, lng: &str) -> Location {
        Location::Waypoint(Waypoint {
            designator: designator.to_string(),
            coordinate: Coordinate::deg_min_sec(lat, lng),
        })
    }

    fn features(sct: &Sct, ese: Option<&Ese>, asr: Option<&Asr>) -> serde_json::Value {
        let collection = to_feature_collection(sct, ese, asr, Projection::Wgs84).unwrap();
        serde_json::to_value(collection.features).unwrap()
    }

    #[test]
    fn test_empty() {
        let collection =
            to_feature_collection(&empty_sct(), None, Some(&Asr::default()), Projection::default())
                .unwrap();
        assert!(collection.features.is_empty());
    }

    #[test]
    fn test_vor_and_fix() {
        let sct = Sct::parse(
            b"[VOR]
GRM 115.950 N060.11.30.328 E011.04.27.908
[FIXES]
BAVAD N060.27.57.999 E011.05.03.998
",
        )
        .unwrap();

        assert_eq!(
            features(&sct, None, None),
            json!([
                {
                    "type": "Feature",
                    "geometry": { "type": "Point", "coordinates": [11.074_419, 60.191_758] },
                    "properties": { "type": "vor", "name": "GRM", "freq": "115.950" },
                },
                {
                    "type": "Feature",
                    "geometry": { "type": "Point", "coordinates": [11.084_444, 60.466_111] },
                    "properties": { "type": "fix", "name": "BAVAD" },
                },
            ])
        );
    }

    #[test]
    fn test_star_segments() {
        let sct = Sct {
            stars: vec![Geo {
                id: "ENGM STARS RWY 01".to_string(),
                segments: vec![
                    Segment {
                        start: waypoint("ADOPI", "N060.19.24.999", "E009.22.59.998"),
                        end: waypoint("NIVDU", "N060.16.19.999", "E009.51.50.000"),
                        color: Some(Color::new("COLOR_APP", 13_158_600)),
                    },
                    Segment {
                        start: waypoint("NIVDU", "N060.16.19.999", "E009.51.50.000"),
                        end: waypoint("GM402", "N060.07.49.101", "E010.15.10.198"),
                        color: None,
                    },
                ],
            }],
            ..empty_sct()
        };

        assert_eq!(
            features(&sct, None, None),
            json!([
                {
                    "type": "Feature",
                    "geometry": {
                        "type": "LineString",
                        "coordinates": [[9.383_333, 60.323_611], [9.863_889, 60.272_222]],
                    },
                    "properties": {
                        "type": "star",
                        "section": "ENGM STARS RWY 01",
                        "color": [200, 200, 200],
                    },
                },
                {
                    "type": "Feature",
                    "geometry": {
                        "type": "LineString",
                        "coordinates": [[9.863_889, 60.272_222], [10.252_833, 60.130_306]],
                    },
                    "properties": { "type": "star", "section": "ENGM STARS RWY 01" },
                },
            ])
        );
    }

    #[test]
    fn test_region_polygons() {
        let sct = Sct {
            regions: vec![Region {
                id: "ENML".to_string(),
                polygons: vec![Polygon {
                    color: Color::new("COLOR_Building", 3_881_787),
                    points: vec![
                        Coordinate::deg_min_sec("N062.44.43.705", "E007.15.21.800"),
                        Coordinate::deg_min_sec("N062.44.43.497", "E007.15.23.427"),
                        Coordinate::deg_min_sec("N062.44.44.006", "E007.15.23.717"),
                        Coordinate::deg_min_sec("N062.44.44.210", "E007.15.22.090"),
                    ],
                }],
            }],
            ..empty_sct()
        };

        assert_eq!(
            features(&sct, None, None),
            json!([{
                "type": "Feature",
                "geometry": {
                    "type": "Polygon",
                    "coordinates": [[
                        [7.256_056, 62.745_474],
                        [7.256_508, 62.745_416],
                        [7.256_588, 62.745_557],
                        [7.256_136, 62.745_614],
                    ]],
                },
                "properties": { "type": "region", "region": "ENML", "color": [59, 59, 59] },
            }])
        );
    }

    #[test]
    fn test_labels_and_free_text() {
        let sct = Sct::parse(
            b"#define FREETEXT_COLOR 13158600
[LABELS]
VORMSUND N060.09.18.000 E011.25.05.000 FREETEXT_COLOR
",
        )
        .unwrap();
        let ese = Ese {
            free_text: MultiMap::from_iter([
                (
                    "ENGM VFR Reporting Points".to_string(),
                    FreeText {
                        text: "NANNESTAD".to_string(),
                        coordinate: Coordinate::deg_min_sec("N060.13.03.000", "E010.58.15.000"),
                    },
                ),
                (
                    "ENGM VFR Reporting Points".to_string(),
                    FreeText {
                        text: "NORDKISA".to_string(),
                        coordinate: Coordinate::deg_min_sec("N060.11.05.000", "E011.15.50.000"),
                    },
                ),
            ]),
            ..Ese::default()
        };

        assert_eq!(
            features(&sct, Some(&ese), None),
            json!([
                {
                    "type": "Feature",
                    "geometry": { "type": "Point", "coordinates": [11.418_056, 60.155] },
                    "properties": { "type": "label", "value": "VORMSUND", "color": [200, 200, 200] },
                },
                {
                    "type": "Feature",
                    "geometry": { "type": "Point", "coordinates": [10.970_833, 60.2175] },
                    "properties": {
                        "type": "label",
                        "section": "ENGM VFR Reporting Points",
                        "value": "NANNESTAD",
                    },
                },
                {
                    "type": "Feature",
                    "geometry": { "type": "Point", "coordinates": [11.263_889, 60.184_722] },
                    "properties": {
                        "type": "label",
                        "section": "ENGM VFR Reporting Points",
                        "value": "NORDKISA",
                    },
                },
            ])
        );

        // labels stay, unlisted free texts go
        let asr = Asr::parse(b"Free Text:ENGM VFR Reporting Points\\NORDKISA:freetext").unwrap();
        let filtered = features(&sct, Some(&ese), Some(&asr));
        let values = filtered
            .as_array()
            .unwrap()
            .iter()
            .map(|feature| feature["properties"]["value"].clone())
            .collect::<Vec<_>>();
        assert_eq!(values, [json!("VORMSUND"), json!("NORDKISA")]);
    }

    #[test]
    fn test_selection() {
        let sct = Sct::parse(
            b"#define COLOR_TWR-CTR 13158600
[VOR]
GRM 115.950 N060.11.30.328 E011.04.27.908
OSL 114.850 N059.58.38.000 E010.53.10.000
[RUNWAY]
01L 19R 014 194 N060.10.59.000 E011.04.22.000 N060.12.53.000 E011.05.24.000 ENGM Oslo Gardermoen
01R 19L 014 194 N060.10.58.000 E011.06.40.000 N060.12.59.000 E011.07.49.000 ENGM Oslo Gardermoen
[ARTCC LOW]
CTR - ENGM N060.01.54.946 E011.00.16.024 N060.00.47.000 E011.08.04.000 COLOR_TWR-CTR
CTR - ENRY N059.22.43.211 E010.12.19.529 N059.22.16.000 E010.15.25.000 COLOR_TWR-CTR
",
        )
        .unwrap();
        let asr = Asr::parse(
            b"VORs:GRM:name
ARTCC low boundary:CTR - ENGM:
Runways:ENGM Oslo Gardermoen 01L-19R:centerline
",
        )
        .unwrap();

        let features = features(&sct, None, Some(&asr));
        let features = features.as_array().unwrap();
        assert_eq!(features.len(), 3);
        assert_eq!(
            features[0],
            json!({
                "type": "Feature",
                "geometry": {
                    "type": "LineString",
                    "coordinates": [[11.004_451, 60.031_929], [11.134_444, 60.013_056]],
                },
                "properties": { "type": "artcc-low", "section": "CTR - ENGM", "color": [200, 200, 200] },
            })
        );
        assert_eq!(features[1]["id"], json!("ENGM: 01L"));
        assert_eq!(
            features[1]["properties"],
            json!({
                "type": "runway",
                "name": "01L",
                "oppositeId": "19R",
                "icao": "ENGM",
                "airport": "Oslo Gardermoen",
            })
        );
        assert_eq!(features[2]["properties"]["name"], json!("GRM"));
    }

    #[test]
    fn test_mercator() {
        let sct = Sct {
            vors: vec![VOR {
                designator: "NUL".to_string(),
                frequency: "110.000".to_string(),
                coordinate: Coordinate::deg_min_sec("N000.00.00.000", "E000.00.00.000"),
            }],
            runways: vec![Runway {
                designators: ("09".to_string(), "27".to_string()),
                headings: (90.0, 270.0),
                location: (Coordinate::decimal(0.0, 0.0), Coordinate::decimal(0.0, 180.0)),
                aerodrome: "ZZZZ".to_string(),
                aerodrome_name: None,
            }],
            ..empty_sct()
        };
        let collection = to_feature_collection(&sct, None, None, Projection::Mercator).unwrap();
        let features = serde_json::to_value(collection.features).unwrap();

        let origin = &features[1]["geometry"]["coordinates"];
        assert!(origin[0].as_f64().unwrap().abs() < 1e-6);
        assert!(origin[1].as_f64().unwrap().abs() < 1e-6);
        let east = features[0]["geometry"]["coordinates"][1][0].as_f64().unwrap();
        assert!((east - std::f64::consts::PI * 6_378_137.0).abs() < 1e-6);
        assert!(features[0]["properties"].get("airport").is_none());
    }
}
