use std::collections::BTreeMap;

use mrirecon_frame::{MessageKind, WireError, WireMessage, WireReader, WireWriter};

use crate::store::{ConfigStore, ParamMap};

fn put_string_map(dst: &mut WireWriter<'_>, map: &ParamMap) -> Result<(), WireError> {
    dst.put_count(map.len())?;
    for (key, value) in map {
        dst.put_string(key)?;
        dst.put_string(value)?;
    }
    Ok(())
}

fn get_string_map(src: &mut WireReader<'_>) -> Result<ParamMap, WireError> {
    let count = src.get_count()?;
    let mut map = ParamMap::new();
    for _ in 0..count {
        let key = src.get_string()?;
        let value = src.get_string()?;
        map.entry(key).or_insert(value);
    }
    Ok(map)
}

fn put_scoped(
    dst: &mut WireWriter<'_>,
    tier: &BTreeMap<String, ParamMap>,
) -> Result<(), WireError> {
    dst.put_count(tier.len())?;
    for (name, params) in tier {
        dst.put_string(name)?;
        put_string_map(dst, params)?;
    }
    Ok(())
}

fn get_scoped(src: &mut WireReader<'_>) -> Result<BTreeMap<String, ParamMap>, WireError> {
    let count = src.get_count()?;
    let mut tier = BTreeMap::new();
    for _ in 0..count {
        let name = src.get_string()?;
        let params = get_string_map(src)?;
        tier.entry(name).or_insert(params);
    }
    Ok(tier)
}

/// Global map, then the id tier, then the alias tier. Each tier is a count
/// followed by `(name, map)` pairs; a map is a count of `(key, value)` pairs.
impl WireMessage for ConfigStore {
    const KIND: MessageKind = MessageKind::Config;

    fn encode(&self, dst: &mut WireWriter<'_>) -> Result<(), WireError> {
        put_string_map(dst, &self.global)?;
        put_scoped(dst, &self.by_id)?;
        put_scoped(dst, &self.by_alias)
    }

    fn decode(src: &mut WireReader<'_>) -> Result<Self, WireError> {
        Ok(Self {
            global: get_string_map(src)?,
            by_id: get_scoped(src)?,
            by_alias: get_scoped(src)?,
        })
    }
}
