use crate::commands::command_error::CommandError;
use crate::commands::geo_utils::decode_score;
use crate::key_value_store::{get_live, DataType, KeyValueStore};
use crate::resp::RespValue;

/// GEOPOS decodes each member's score back to `[longitude, latitude]`; an
/// absent member (or key) yields a null array element in its position.
pub fn geopos(store: &mut KeyValueStore, arguments: &[String]) -> Result<String, CommandError> {
    if arguments.len() < 2 {
        return Err(CommandError::WrongNumberOfArguments("geopos".to_string()));
    }

    let members = &arguments[1..];

    let set = match get_live(store, &arguments[0]) {
        None => None,
        Some(value) => match &value.data {
            DataType::SortedSet(set) => Some(set.clone()),
            _ => return Err(CommandError::WrongType),
        },
    };

    let positions = members
        .iter()
        .map(|member| {
            let score = set.as_ref().and_then(|set| set.score(member));

            match score {
                Some(score) => {
                    let (longitude, latitude) = decode_score(score as u64);

                    RespValue::Array(vec![
                        RespValue::BulkString(format!("{}", longitude)),
                        RespValue::BulkString(format!("{}", latitude)),
                    ])
                }
                None => RespValue::NullArray,
            }
        })
        .collect::<Vec<RespValue>>();

    Ok(RespValue::Array(positions).encode())
}
