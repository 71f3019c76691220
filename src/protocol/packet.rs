/// Module for the network packets exchanged with the game client.
pub mod client;
pub mod server;

use crate::protocol::buffer::ByteBuffer;
use crate::Result;
use anyhow::ensure;
use flate2::{Decompress, FlushDecompress};

/// CRC every unmodified official sub-addon reports. A divergence is logged
/// but never rejects the client.
pub const WELL_KNOWN_ADDON_CRC: u32 = 0x4C1C_776D;

/// The official sub-addons a stock client announces.
pub const WELL_KNOWN_ADDONS: [&str; 23] = [
    "Blizzard_AchievementUI",
    "Blizzard_ArenaUI",
    "Blizzard_AuctionUI",
    "Blizzard_BarbershopUI",
    "Blizzard_BattlefieldMinimap",
    "Blizzard_BindingUI",
    "Blizzard_Calendar",
    "Blizzard_CombatLog",
    "Blizzard_CombatText",
    "Blizzard_DebugTools",
    "Blizzard_GlyphUI",
    "Blizzard_GMChatUI",
    "Blizzard_GMSurveyUI",
    "Blizzard_GuildBankUI",
    "Blizzard_InspectUI",
    "Blizzard_ItemSocketingUI",
    "Blizzard_MacroUI",
    "Blizzard_RaidUI",
    "Blizzard_TalentUI",
    "Blizzard_TimeManager",
    "Blizzard_TokenUI",
    "Blizzard_TradeSkillUI",
    "Blizzard_TrainerUI",
];

/// One announced addon. Consumed for validation only, never persisted.
#[derive(Clone, Debug, PartialEq)]
pub struct AddonEntry {
    pub name: String,
    pub enabled: u8,
    pub crc: u32,
    pub reserved: u32,
}

/// Inflate and parse the addon manifest riding at the tail of the auth
/// session packet: a little-endian decompressed size followed by a zlib
/// deflate stream of `u32 count` entries.
pub fn parse_addon_manifest(buffer: &mut ByteBuffer) -> Result<Vec<AddonEntry>> {
    let size = buffer.read_u32()? as usize;
    ensure!(
        size > 0 && size < 0xF_FFFF,
        "addon manifest size {} out of range",
        size
    );

    let mut decompressor = Decompress::new(true);
    let mut inflated = Vec::with_capacity(size);
    decompressor.decompress_vec(buffer.read_ptr(), &mut inflated, FlushDecompress::None)?;
    ensure!(
        decompressor.total_out() == size as u64,
        "decompression was successful, but data was missing to finish it"
    );
    buffer.skip(decompressor.total_in() as usize)?;

    let mut manifest = ByteBuffer::from_vec(inflated);
    let count = manifest.read_u32()?;
    let mut entries = Vec::with_capacity(count.min(256) as usize);
    for _ in 0..count {
        entries.push(AddonEntry {
            name: manifest.read_cstring()?,
            enabled: manifest.read_u8()?,
            crc: manifest.read_u32()?,
            reserved: manifest.read_u32()?,
        });
    }
    Ok(entries)
}
