use crate::commands::command_error::CommandError;
use crate::commands::geo_utils::{decode_score, haversine_distance, unit_to_meters};
use crate::key_value_store::{get_live, DataType, KeyValueStore};
use crate::resp::RespValue;

pub struct GeosearchArguments {
    key: String,
    longitude: f64,
    latitude: f64,
    radius_meters: f64,
}

impl GeosearchArguments {
    /// `GEOSEARCH key FROMLONLAT lon lat BYRADIUS radius unit`.
    pub fn parse(arguments: &[String]) -> Result<Self, CommandError> {
        if arguments.len() != 7 {
            return Err(CommandError::WrongNumberOfArguments("geosearch".to_string()));
        }

        if !arguments[1].eq_ignore_ascii_case("FROMLONLAT")
            || !arguments[4].eq_ignore_ascii_case("BYRADIUS")
        {
            return Err(CommandError::SyntaxError);
        }

        let longitude = arguments[2]
            .parse::<f64>()
            .map_err(|_| CommandError::NotAFloat)?;
        let latitude = arguments[3]
            .parse::<f64>()
            .map_err(|_| CommandError::NotAFloat)?;
        let radius = arguments[5]
            .parse::<f64>()
            .map_err(|_| CommandError::NotAFloat)?;

        Ok(Self {
            key: arguments[0].clone(),
            longitude,
            latitude,
            radius_meters: radius * unit_to_meters(&arguments[6])?,
        })
    }
}

/// GEOSEARCH scans the whole set and keeps the members whose decoded
/// position lies within the radius of the search center.
pub fn geosearch(store: &mut KeyValueStore, arguments: &[String]) -> Result<String, CommandError> {
    let args = GeosearchArguments::parse(arguments)?;

    let Some(value) = get_live(store, &args.key) else {
        return Ok(RespValue::Array(Vec::new()).encode());
    };

    let DataType::SortedSet(set) = &value.data else {
        return Err(CommandError::WrongType);
    };

    let matches: Vec<String> = set
        .ordered()
        .into_iter()
        .filter(|(_, score)| {
            let (longitude, latitude) = decode_score(*score as u64);

            haversine_distance(args.longitude, args.latitude, longitude, latitude)
                <= args.radius_meters
        })
        .map(|(member, _)| member)
        .collect();

    Ok(RespValue::encode_array_from_strings(matches))
}
