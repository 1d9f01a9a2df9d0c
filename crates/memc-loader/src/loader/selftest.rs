use anyhow::{Context, bail};
use memc_loader_core::{UserApps, encode_record, parse_apps_installed};

/// Sample lines exercised by `--test`.
pub const SAMPLE: [&str; 2] = [
    "idfa\t1rfw452y52g2gq4g\t55.55\t42.42\t1423,43,567,3,7,23",
    "gaid\t7rfw452y52g2gq4g\t55.55\t42.42\t7423,424",
];

/// Parses, packs and unpacks every sample line, failing on the first
/// mismatch. Touches neither the file system nor the network.
///
/// # Errors
///
/// Fails if a sample is rejected by the parser, cannot be (de)serialized, or
/// does not survive the round trip unchanged.
pub fn run_self_test() -> anyhow::Result<()> {
    for line in SAMPLE {
        let record =
            parse_apps_installed(line).with_context(|| format!("Invalid sample line {line:?}"))?;

        let original = UserApps::from(&record);
        let packed = encode_record(&record).context("Marshaling error")?;
        let unpacked = UserApps::unpack(&packed).context("Unmarshaling error")?;

        if original != unpacked {
            bail!("Protobuf mismatch:\nOriginal: {original:?}\nUnpacked: {unpacked:?}");
        }

        tracing::info!("Successfully processed data for {}", record.key());
    }

    Ok(())
}
