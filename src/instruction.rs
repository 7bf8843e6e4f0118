/// A decoded CHIP-8 instruction. Register operands are indices into the V registers.
///
/// Decoding never fails: encodings outside the instruction set become `Unknown`, which the
/// interpreter reports and skips.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Instruction {
    /// `0nnn` SYS addr. Machine-code routine on the COSMAC VIP, ignored by this interpreter.
    Sys(u16),
    /// `00E0` CLS
    Cls,
    /// `00EE` RET
    Ret,
    /// `1nnn` JP addr
    Jump(u16),
    /// `2nnn` CALL addr
    Call(u16),
    /// `3xkk` SE Vx, byte
    SkipEqImm(usize, u8),
    /// `4xkk` SNE Vx, byte
    SkipNeImm(usize, u8),
    /// `5xy0` SE Vx, Vy
    SkipEqReg(usize, usize),
    /// `6xkk` LD Vx, byte
    LoadImm(usize, u8),
    /// `7xkk` ADD Vx, byte
    AddImm(usize, u8),
    /// `8xy0` LD Vx, Vy
    Move(usize, usize),
    /// `8xy1` OR Vx, Vy
    Or(usize, usize),
    /// `8xy2` AND Vx, Vy
    And(usize, usize),
    /// `8xy3` XOR Vx, Vy
    Xor(usize, usize),
    /// `8xy4` ADD Vx, Vy
    AddReg(usize, usize),
    /// `8xy5` SUB Vx, Vy
    Sub(usize, usize),
    /// `8xy6` SHR Vx {, Vy}
    ShiftRight(usize, usize),
    /// `8xy7` SUBN Vx, Vy
    SubReversed(usize, usize),
    /// `8xyE` SHL Vx {, Vy}
    ShiftLeft(usize, usize),
    /// `9xy0` SNE Vx, Vy
    SkipNeReg(usize, usize),
    /// `Annn` LD I, addr
    LoadI(u16),
    /// `Bnnn` JP V0, addr
    JumpV0(u16),
    /// `Cxkk` RND Vx, byte
    Random(usize, u8),
    /// `Dxyn` DRW Vx, Vy, nibble
    Draw(usize, usize, u8),
    /// `Ex9E` SKP Vx
    SkipKeyPressed(usize),
    /// `ExA1` SKNP Vx
    SkipKeyNotPressed(usize),
    /// `Fx07` LD Vx, DT
    LoadDelay(usize),
    /// `Fx0A` LD Vx, K
    WaitKey(usize),
    /// `Fx15` LD DT, Vx
    SetDelay(usize),
    /// `Fx18` LD ST, Vx
    SetSound(usize),
    /// `Fx1E` ADD I, Vx
    AddI(usize),
    /// `Fx29` LD F, Vx
    LoadFont(usize),
    /// `Fx33` LD B, Vx
    StoreBcd(usize),
    /// `Fx55` LD [I], Vx
    StoreRegs(usize),
    /// `Fx65` LD Vx, [I]
    LoadRegs(usize),
    /// Any encoding outside the instruction set.
    Unknown(u16),
}

impl Instruction {
    /// Decode a big-endian instruction word. The instruction type is determined by the most
    /// significant nibble; the 0, 8, E and F families are further split on the low nibble/byte.
    pub fn decode(instr: u16) -> Instruction {
        let x = decode_instr_x_reg(instr);
        let y = decode_instr_y_reg(instr);
        let kk = decode_instr_byte_imm(instr);
        let nnn = decode_instr_addr(instr);

        match (instr & 0xF000) >> 12 {
            0x0 => match instr {
                0x00E0 => Instruction::Cls,
                0x00EE => Instruction::Ret,
                _ => Instruction::Sys(nnn),
            },
            0x1 => Instruction::Jump(nnn),
            0x2 => Instruction::Call(nnn),
            0x3 => Instruction::SkipEqImm(x, kk),
            0x4 => Instruction::SkipNeImm(x, kk),
            0x5 if instr & 0xF == 0 => Instruction::SkipEqReg(x, y),
            0x6 => Instruction::LoadImm(x, kk),
            0x7 => Instruction::AddImm(x, kk),
            0x8 => match instr & 0xF {
                0x0 => Instruction::Move(x, y),
                0x1 => Instruction::Or(x, y),
                0x2 => Instruction::And(x, y),
                0x3 => Instruction::Xor(x, y),
                0x4 => Instruction::AddReg(x, y),
                0x5 => Instruction::Sub(x, y),
                0x6 => Instruction::ShiftRight(x, y),
                0x7 => Instruction::SubReversed(x, y),
                0xE => Instruction::ShiftLeft(x, y),
                _ => Instruction::Unknown(instr),
            },
            0x9 if instr & 0xF == 0 => Instruction::SkipNeReg(x, y),
            0xA => Instruction::LoadI(nnn),
            0xB => Instruction::JumpV0(nnn),
            0xC => Instruction::Random(x, kk),
            0xD => Instruction::Draw(x, y, decode_instr_nibble_imm(instr)),
            0xE => match kk {
                0x9E => Instruction::SkipKeyPressed(x),
                0xA1 => Instruction::SkipKeyNotPressed(x),
                _ => Instruction::Unknown(instr),
            },
            0xF => match kk {
                0x07 => Instruction::LoadDelay(x),
                0x0A => Instruction::WaitKey(x),
                0x15 => Instruction::SetDelay(x),
                0x18 => Instruction::SetSound(x),
                0x1E => Instruction::AddI(x),
                0x29 => Instruction::LoadFont(x),
                0x33 => Instruction::StoreBcd(x),
                0x55 => Instruction::StoreRegs(x),
                0x65 => Instruction::LoadRegs(x),
                _ => Instruction::Unknown(instr),
            },
            _ => Instruction::Unknown(instr),
        }
    }
}

/// Decodes a memory address from a CHIP-8 instruction
fn decode_instr_addr(instr: u16) -> u16 {
    instr & 0x0FFF
}

/// Decodes the first register from a CHIP-8 instruction
fn decode_instr_x_reg(instr: u16) -> usize {
    ((instr & 0x0F00) >> 8) as usize
}

/// Decodes the second register from a CHIP-8 instruction
fn decode_instr_y_reg(instr: u16) -> usize {
    ((instr & 0x00F0) >> 4) as usize
}

/// Decodes a byte-sized immediate from a CHIP-8 instruction
fn decode_instr_byte_imm(instr: u16) -> u8 {
    (instr & 0x00FF) as u8
}

/// Decodes a nibble-sized immediate from a CHIP-8 instruction
fn decode_instr_nibble_imm(instr: u16) -> u8 {
    (instr & 0x000F) as u8
}
