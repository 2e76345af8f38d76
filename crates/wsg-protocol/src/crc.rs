//! CRC16 校验和
//!
//! 设备固件使用查表式 CRC-16/CCITT 反射算法（多项式 0x8408，初值 0xFFFF，
//! 即 CRC-16/MCRF4XX）。该算法是与物理设备的固定契约，必须与固件逐位一致，
//! 不得替换或"改进"。

/// 反射多项式（0x1021 的位反转）
const POLY: u16 = 0x8408;

/// 编译期生成的 CCITT16 查找表，与固件的 `CRC_TABLE_CCITT16` 等价
const CRC_TABLE_CCITT16: [u16; 256] = build_table();

const fn build_table() -> [u16; 256] {
    let mut table = [0u16; 256];
    let mut i = 0;
    while i < 256 {
        let mut crc = i as u16;
        let mut bit = 0;
        while bit < 8 {
            crc = if crc & 1 != 0 { (crc >> 1) ^ POLY } else { crc >> 1 };
            bit += 1;
        }
        table[i] = crc;
        i += 1;
    }
    table
}

/// 在已有校验值上继续累加数据
///
/// 与固件的 `checksum_update_crc16` 同名同义；整帧校验从 `0xFFFF` 开始。
pub fn checksum_update_crc16(data: &[u8], mut crc: u16) -> u16 {
    for &byte in data {
        crc = CRC_TABLE_CCITT16[((crc ^ byte as u16) & 0x00FF) as usize] ^ (crc >> 8);
    }
    crc
}

/// 计算一段数据的完整校验和（初值 0xFFFF）
pub fn crc16(data: &[u8]) -> u16 {
    checksum_update_crc16(data, 0xFFFF)
}
