//! ESRI `.prj` sidecar files: EPSG detection and WKT generation.

use crate::models::Crs;

const AUTHORITY_PREFIX: &str = "AUTHORITY[\"EPSG\",\"";

/// Parse `.prj` content into a CRS tag
///
/// The WKT is always kept; the EPSG code is filled in when it can be
/// identified.
pub fn parse_prj(content: &str) -> Option<Crs> {
    let wkt = content.trim().trim_start_matches('\u{feff}');
    if wkt.is_empty() {
        return None;
    }
    Some(Crs::from_wkt(wkt, epsg_from_wkt(wkt)))
}

/// Identify the EPSG code of a WKT definition
///
/// Tries, in order: the outermost `AUTHORITY["EPSG","…"]` (the last one in
/// the text, since nested datum and unit authorities come first), an
/// `EPSG:<code>` reference, then well-known ESRI CRS names.
pub fn epsg_from_wkt(wkt: &str) -> Option<u32> {
    if let Some(start) = wkt.rfind(AUTHORITY_PREFIX) {
        let code_start = start + AUTHORITY_PREFIX.len();
        if let Some(end) = wkt[code_start..].find('"') {
            if let Ok(code) = wkt[code_start..code_start + end].parse::<u32>() {
                return Some(code);
            }
        }
    }

    if let Some(start) = wkt.find("EPSG:") {
        let digits: String = wkt[start + 5..]
            .trim_start_matches(':')
            .chars()
            .take_while(|c| c.is_ascii_digit())
            .collect();
        if let Ok(code) = digits.parse::<u32>() {
            return Some(code);
        }
    }

    root_name(wkt).and_then(|name| epsg_from_esri_name(&name))
}

/// Name of the root `PROJCS`/`GEOGCS` node
fn root_name(wkt: &str) -> Option<String> {
    let open = wkt.find('[')?;
    let keyword = wkt[..open].trim();
    if !matches!(keyword, "PROJCS" | "GEOGCS" | "PROJCRS" | "GEOGCRS") {
        return None;
    }
    let rest = &wkt[open + 1..];
    let start = rest.find('"')? + 1;
    let end = rest[start..].find('"')? + start;
    Some(rest[start..end].to_string())
}

/// Map ESRI/OGC CRS names to EPSG codes
pub fn epsg_from_esri_name(name: &str) -> Option<u32> {
    let normalized = name.replace([' ', '/', '-'], "_").to_ascii_uppercase();
    let normalized = normalized
        .split('_')
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join("_");

    match normalized.as_str() {
        "GCS_WGS_1984" | "WGS_84" | "WGS_1984" => return Some(4326),
        "GCS_ETRS_1989" | "ETRS89" => return Some(4258),
        "WGS_1984_WEB_MERCATOR_AUXILIARY_SPHERE" | "WGS_84_PSEUDO_MERCATOR"
        | "WEB_MERCATOR" => return Some(3857),
        "RGF_1993_LAMBERT_93" | "RGF93_LAMBERT_93" => return Some(2154),
        "ETRS_1989_LAEA" | "ETRS89_LAEA_EUROPE" | "ETRS_1989_LAEA_EUROPE" => return Some(3035),
        _ => {}
    }

    if let Some(zone) = utm_zone(&normalized, "ETRS_1989_UTM_ZONE_")
        .or_else(|| utm_zone(&normalized, "ETRS89_UTM_ZONE_"))
    {
        let (number, north) = zone;
        if north && (28..=38).contains(&number) {
            return Some(25800 + number);
        }
    }

    if let Some((number, north)) = utm_zone(&normalized, "WGS_1984_UTM_ZONE_")
        .or_else(|| utm_zone(&normalized, "WGS_84_UTM_ZONE_"))
    {
        if (1..=60).contains(&number) {
            return Some(if north { 32600 + number } else { 32700 + number });
        }
    }

    for prefix in ["DHDN_3_DEGREE_GAUSS_ZONE_", "DHDN_GAUSS_KRUGER_ZONE_", "DHDN_3_GK_ZONE_"] {
        if let Some(zone) = normalized.strip_prefix(prefix).and_then(|z| z.parse::<u32>().ok()) {
            if (2..=5).contains(&zone) {
                return Some(31464 + zone);
            }
        }
    }

    None
}

/// Parse `<prefix><number><N|S>` into `(zone, is_north)`
fn utm_zone(name: &str, prefix: &str) -> Option<(u32, bool)> {
    let rest = name.strip_prefix(prefix)?;
    if let Some(number) = rest.strip_suffix('N') {
        return number.parse::<u32>().ok().map(|zone| (zone, true));
    }
    let number = rest.strip_suffix('S')?;
    number.parse::<u32>().ok().map(|zone| (zone, false))
}

/// WKT to write into a `.prj` file for the CRS
///
/// Prefers the WKT read from the source file; otherwise generates one for common EPSG codes.
pub fn prj_content(crs: &Crs) -> Option<String> {
    if let Some(wkt) = &crs.wkt {
        return Some(wkt.clone());
    }
    crs.epsg.and_then(wkt_for_epsg)
}

const WGS84_GEOGCS: &str = r#"GEOGCS["WGS 84",DATUM["WGS_1984",SPHEROID["WGS 84",6378137,298.257223563,AUTHORITY["EPSG","7030"]],AUTHORITY["EPSG","6326"]],PRIMEM["Greenwich",0,AUTHORITY["EPSG","8901"]],UNIT["degree",0.0174532925199433,AUTHORITY["EPSG","9122"]],AUTHORITY["EPSG","4326"]]"#;

const ETRS89_GEOGCS: &str = r#"GEOGCS["ETRS89",DATUM["European_Terrestrial_Reference_System_1989",SPHEROID["GRS 1980",6378137,298.257222101,AUTHORITY["EPSG","7019"]],AUTHORITY["EPSG","6258"]],PRIMEM["Greenwich",0,AUTHORITY["EPSG","8901"]],UNIT["degree",0.0174532925199433,AUTHORITY["EPSG","9122"]],AUTHORITY["EPSG","4258"]]"#;

const RGF93_GEOGCS: &str = r#"GEOGCS["RGF93",DATUM["Reseau_Geodesique_Francais_1993",SPHEROID["GRS 1980",6378137,298.257222101,AUTHORITY["EPSG","7019"]],TOWGS84[0,0,0,0,0,0,0],AUTHORITY["EPSG","6171"]],PRIMEM["Greenwich",0,AUTHORITY["EPSG","8901"]],UNIT["degree",0.0174532925199433,AUTHORITY["EPSG","9122"]],AUTHORITY["EPSG","4171"]]"#;

const DHDN_GEOGCS: &str = r#"GEOGCS["DHDN",DATUM["Deutsches_Hauptdreiecksnetz",SPHEROID["Bessel 1841",6377397.155,299.1528128,AUTHORITY["EPSG","7004"]],TOWGS84[598.1,73.7,418.2,0.202,0.045,-2.455,6.7],AUTHORITY["EPSG","6314"]],PRIMEM["Greenwich",0,AUTHORITY["EPSG","8901"]],UNIT["degree",0.0174532925199433,AUTHORITY["EPSG","9122"]],AUTHORITY["EPSG","4314"]]"#;

/// Generated WKT for EPSG codes this tool commonly meets
pub fn wkt_for_epsg(code: u32) -> Option<String> {
    match code {
        4326 => Some(WGS84_GEOGCS.to_string()),
        4258 => Some(ETRS89_GEOGCS.to_string()),
        3857 => Some(format!(
            r#"PROJCS["WGS 84 / Pseudo-Mercator",{},PROJECTION["Mercator_1SP"],PARAMETER["central_meridian",0],PARAMETER["scale_factor",1],PARAMETER["false_easting",0],PARAMETER["false_northing",0],UNIT["metre",1,AUTHORITY["EPSG","9001"]],AXIS["Easting",EAST],AXIS["Northing",NORTH],EXTENSION["PROJ4","+proj=merc +a=6378137 +b=6378137 +lat_ts=0 +lon_0=0 +x_0=0 +y_0=0 +k=1 +units=m +nadgrids=@null +wktext +no_defs"],AUTHORITY["EPSG","3857"]]"#,
            WGS84_GEOGCS
        )),
        2154 => Some(format!(
            r#"PROJCS["RGF93 / Lambert-93",{},PROJECTION["Lambert_Conformal_Conic_2SP"],PARAMETER["standard_parallel_1",49],PARAMETER["standard_parallel_2",44],PARAMETER["latitude_of_origin",46.5],PARAMETER["central_meridian",3],PARAMETER["false_easting",700000],PARAMETER["false_northing",6600000],UNIT["metre",1,AUTHORITY["EPSG","9001"]],AXIS["Easting",EAST],AXIS["Northing",NORTH],AUTHORITY["EPSG","2154"]]"#,
            RGF93_GEOGCS
        )),
        3035 => Some(format!(
            r#"PROJCS["ETRS89 / LAEA Europe",{},PROJECTION["Lambert_Azimuthal_Equal_Area"],PARAMETER["latitude_of_center",52],PARAMETER["longitude_of_center",10],PARAMETER["false_easting",4321000],PARAMETER["false_northing",3210000],UNIT["metre",1,AUTHORITY["EPSG","9001"]],AXIS["Northing",NORTH],AXIS["Easting",EAST],AUTHORITY["EPSG","3035"]]"#,
            ETRS89_GEOGCS
        )),
        25828..=25838 => {
            let zone = code - 25800;
            Some(transverse_mercator(
                &format!("ETRS89 / UTM zone {}N", zone),
                ETRS89_GEOGCS,
                utm_central_meridian(zone),
                0.9996,
                500000.0,
                0.0,
                code,
            ))
        }
        32601..=32660 | 32701..=32760 => {
            let north = code < 32700;
            let zone = if north { code - 32600 } else { code - 32700 };
            Some(transverse_mercator(
                &format!("WGS 84 / UTM zone {}{}", zone, if north { "N" } else { "S" }),
                WGS84_GEOGCS,
                utm_central_meridian(zone),
                0.9996,
                500000.0,
                if north { 0.0 } else { 10000000.0 },
                code,
            ))
        }
        31466..=31469 => {
            let zone = code - 31464;
            Some(transverse_mercator(
                &format!("DHDN / 3-degree Gauss-Kruger zone {}", zone),
                DHDN_GEOGCS,
                f64::from(zone * 3),
                1.0,
                f64::from(zone) * 1_000_000.0 + 500000.0,
                0.0,
                code,
            ))
        }
        _ => None,
    }
}

fn utm_central_meridian(zone: u32) -> f64 {
    f64::from(zone) * 6.0 - 183.0
}

fn transverse_mercator(
    name: &str,
    geogcs: &str,
    central_meridian: f64,
    scale_factor: f64,
    false_easting: f64,
    false_northing: f64,
    code: u32,
) -> String {
    format!(
        r#"PROJCS["{name}",{geogcs},PROJECTION["Transverse_Mercator"],PARAMETER["latitude_of_origin",0],PARAMETER["central_meridian",{central_meridian}],PARAMETER["scale_factor",{scale_factor}],PARAMETER["false_easting",{false_easting}],PARAMETER["false_northing",{false_northing}],UNIT["metre",1,AUTHORITY["EPSG","9001"]],AXIS["Easting",EAST],AXIS["Northing",NORTH],AUTHORITY["EPSG","{code}"]]"#
    )
}
