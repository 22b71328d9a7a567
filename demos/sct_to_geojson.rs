use std::{env::args_os, io};

use sct_parser::{
    asr::Asr,
    ese::Ese,
    geojson::{to_feature_collection, Projection},
    isec::parse_isec_txt,
    sct::{registry::WaypointRegistry, Sct},
};

fn main() {
    tracing_subscriber::fmt().with_writer(io::stderr).init();
    let mut args = args_os().skip(1);
    let sct_path = args.next().expect("missing argument: path to .sct");
    let out_path = args.next().expect("missing argument: path to output .geojson");
    let ese_path = args.next();
    let asr_path = args.next();
    let isec_path = args.next();

    let registry = isec_path
        .map(|path| {
            let isec = parse_isec_txt(&fs_err::read(path).unwrap()).expect("unsuccessful isec parse");
            WaypointRegistry::from(&isec)
        })
        .unwrap_or_default();

    let sct = match Sct::parse_with_registry(&fs_err::read(sct_path).unwrap(), registry) {
        Ok(sct) => sct,
        Err(e) => {
            eprintln!("{e}");
            return;
        }
    };
    let ese = ese_path.map(|path| Ese::parse(&fs_err::read(path).unwrap()).expect("unsuccessful ese parse"));
    let asr = asr_path.map(|path| Asr::parse(&fs_err::read(path).unwrap()).expect("unsuccessful asr parse"));

    let collection = to_feature_collection(&sct, ese.as_ref(), asr.as_ref(), Projection::Wgs84)
        .expect("coordinate out of range");
    fs_err::write(out_path, collection.to_string()).unwrap();
}
