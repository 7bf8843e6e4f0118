use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::error::Chip8Error;
use crate::instruction::Instruction;
use crate::quirks::Quirks;
use crate::{
    FONT_SPRITES, FONT_SPRITE_LEN, KEY_COUNT, MEM_RESERVED, MEM_SIZE, SCREEN_HEIGHT, SCREEN_WIDTH,
    STACK_DEPTH,
};

/// How the program counter moves once an instruction has executed.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum PcUpdate {
    /// Advance to the following instruction.
    Next,
    /// Skip the following instruction.
    SkipNext,
    /// Continue at the given address.
    JumpTo(u16),
    /// Stay on the current instruction.
    Hold,
}

/// A CHIP-8 interpreter core.
///
/// The host loads a program, then calls `step` at its own cadence. Every call executes exactly one
/// instruction (or nothing, while `Fx0A` is waiting for a key) and then ticks both timers once.
pub struct Cpu {
    // The available memory. While the entire range is addressable, the first 512 bytes are
    // reserved for the interpreter. We only use them to store the font sprites needed by `Fx29`.
    memory: [u8; MEM_SIZE],

    // Stores the call-site address, i.e. the `CALL` instruction itself. `RET` restores it and then
    // advances past it.
    call_stack: [u16; STACK_DEPTH],

    // 16 available registers named V0 through VF. VF is used as a flag in some instructions.
    v_registers: [u8; 16],

    // The I register is used to address memory in some instructions.
    i_register: u16,

    // The address of the next instruction to execute.
    pc_register: u16,

    // The index of the first free `call_stack` cell.
    sp_register: u8,

    // The delay timer and the sound timer registers count down once per step when not zero.
    dt_register: u8,
    st_register: u8,
    // Set when a step brings the sound timer down from 1. Cleared by `consume_tone_flag`.
    tone_pending: bool,

    // Monochrome screen, one byte per pixel holding 0 or 1, row-major.
    screen_buffer: [u8; SCREEN_WIDTH * SCREEN_HEIGHT],
    // Set whenever the buffer is changed. The host redraws and then clears it.
    screen_dirty: bool,

    key_state: [bool; KEY_COUNT],
    // Register that receives the next key press while `Fx0A` is blocking.
    awaiting_key: Option<usize>,

    quirks: Quirks,
    rng: StdRng,
}

impl Cpu {
    /// Construct a cpu at the initial entry state, with the default quirks and an entropy-seeded
    /// random source.
    pub fn new() -> Self {
        Cpu::with_config(Quirks::default(), StdRng::from_entropy())
    }

    /// Construct a cpu whose `Cxkk` results are reproducible for a given seed.
    pub fn with_seed(seed: u64) -> Self {
        Cpu::with_config(Quirks::default(), StdRng::seed_from_u64(seed))
    }

    pub fn with_quirks(quirks: Quirks) -> Self {
        Cpu::with_config(quirks, StdRng::from_entropy())
    }

    /// Construct a fresh cpu with `program` loaded at the entry point.
    pub fn with_program(program: &[u8]) -> Result<Self, Chip8Error> {
        let mut cpu = Cpu::new();
        cpu.load_program(program)?;
        Ok(cpu)
    }

    fn with_config(quirks: Quirks, rng: StdRng) -> Self {
        let mut cpu = Cpu {
            memory: [0; MEM_SIZE],
            call_stack: [0; STACK_DEPTH],
            v_registers: [0; 16],
            i_register: 0,
            pc_register: MEM_RESERVED as u16,
            sp_register: 0,
            dt_register: 0,
            st_register: 0,
            tone_pending: false,
            screen_buffer: [0; SCREEN_WIDTH * SCREEN_HEIGHT],
            screen_dirty: false,
            key_state: [false; KEY_COUNT],
            awaiting_key: None,
            quirks,
            rng,
        };
        cpu.reset();
        cpu
    }

    /// Zero all machine state and reload the font. Quirks and the random source are kept.
    pub fn reset(&mut self) {
        self.memory = [0; MEM_SIZE];
        self.memory[..FONT_SPRITES.len()].copy_from_slice(&FONT_SPRITES);
        self.call_stack = [0; STACK_DEPTH];
        self.v_registers = [0; 16];
        self.i_register = 0;
        self.pc_register = MEM_RESERVED as u16;
        self.sp_register = 0;
        self.dt_register = 0;
        self.st_register = 0;
        self.tone_pending = false;
        self.screen_buffer = [0; SCREEN_WIDTH * SCREEN_HEIGHT];
        self.screen_dirty = false;
        self.key_state = [false; KEY_COUNT];
        self.awaiting_key = None;
    }

    /// Copy `program` into memory at the entry point. Registers, screen and timers are left as
    /// they are; call `reset` first to start from a clean machine.
    pub fn load_program(&mut self, program: &[u8]) -> Result<(), Chip8Error> {
        let max_size = MEM_SIZE - MEM_RESERVED;
        if program.len() > max_size {
            return Err(Chip8Error::ProgramTooLarge {
                size: program.len(),
                max_size,
            });
        }

        self.memory[MEM_RESERVED..MEM_RESERVED + program.len()].copy_from_slice(program);
        log::info!("Loaded {} byte program at {:#05x}", program.len(), MEM_RESERVED);
        Ok(())
    }

    /// Decode and execute one instruction, then tick the timers.
    ///
    /// While an `Fx0A` is waiting for a key no instruction is fetched; the step only checks the key
    /// state and ticks the timers. On error nothing is modified.
    pub fn step(&mut self) -> Result<(), Chip8Error> {
        match self.awaiting_key {
            Some(register) => self.resume_key_wait(register),
            None => {
                let instruction = Instruction::decode(self.fetch()?);
                log::trace!("{:#05x}: {:?}", self.pc_register, instruction);
                let update = self.execute(instruction)?;
                self.apply_pc_update(update);
            }
        }

        self.tick_timers();
        Ok(())
    }

    /// Read-only view of the screen, one cell per pixel, `x + y * SCREEN_WIDTH`.
    pub fn framebuffer(&self) -> &[u8; SCREEN_WIDTH * SCREEN_HEIGHT] {
        &self.screen_buffer
    }

    /// Returns whether or not the screen is dirty, and if it is, sets it to false.
    pub fn consume_dirty_flag(&mut self) -> bool {
        let captured_flag = self.screen_dirty;
        self.screen_dirty = false;
        captured_flag
    }

    /// Returns whether a step has finished a tone since the last call, clearing the event.
    pub fn consume_tone_flag(&mut self) -> bool {
        let captured_flag = self.tone_pending;
        self.tone_pending = false;
        captured_flag
    }

    /// Update the state of a single key.
    pub fn set_key(&mut self, index: usize, pressed: bool) -> Result<(), Chip8Error> {
        let key = self
            .key_state
            .get_mut(index)
            .ok_or(Chip8Error::InvalidKey(index))?;
        *key = pressed;
        Ok(())
    }

    /// Returns true while the sound timer is running.
    pub fn sound_active(&self) -> bool {
        self.st_register > 0
    }

    /// Returns true if the cpu is blocked on `Fx0A`.
    pub fn is_waiting_for_keypress(&self) -> bool {
        self.awaiting_key.is_some()
    }

    pub fn pc(&self) -> u16 {
        self.pc_register
    }

    pub fn i(&self) -> u16 {
        self.i_register
    }

    pub fn sp(&self) -> u8 {
        self.sp_register
    }

    /// Value of register V`index`. Panics if `index` > 15.
    pub fn v(&self, index: usize) -> u8 {
        self.v_registers[index]
    }

    pub fn registers(&self) -> &[u8; 16] {
        &self.v_registers
    }

    pub fn delay_timer(&self) -> u8 {
        self.dt_register
    }

    pub fn sound_timer(&self) -> u8 {
        self.st_register
    }

    pub fn memory(&self) -> &[u8; MEM_SIZE] {
        &self.memory
    }

    pub fn quirks(&self) -> Quirks {
        self.quirks
    }

    /// Instructions are 2 bytes, big-endian.
    fn fetch(&self) -> Result<u16, Chip8Error> {
        let pc = self.pc_register as usize;
        if pc + 1 >= MEM_SIZE {
            return Err(Chip8Error::PcOutOfBounds {
                pc: self.pc_register,
            });
        }
        Ok(((self.memory[pc] as u16) << 8) | (self.memory[pc + 1] as u16))
    }

    fn apply_pc_update(&mut self, update: PcUpdate) {
        match update {
            PcUpdate::Next => self.pc_register += 2,
            PcUpdate::SkipNext => self.pc_register += 4,
            PcUpdate::JumpTo(addr) => self.pc_register = addr,
            PcUpdate::Hold => {}
        }
    }

    fn tick_timers(&mut self) {
        if self.dt_register > 0 {
            self.dt_register -= 1;
        }

        if self.st_register > 0 {
            if self.st_register == 1 {
                log::debug!("Sound timer expired, emitting tone");
                self.tone_pending = true;
            }
            self.st_register -= 1;
        }
    }

    fn skip_if(condition: bool) -> PcUpdate {
        if condition {
            PcUpdate::SkipNext
        } else {
            PcUpdate::Next
        }
    }

    fn is_key_pressed(&self, key: u8) -> bool {
        self.key_state.get(key as usize).copied().unwrap_or(false)
    }

    /// Highest-numbered key currently held, matching a full 0..F scan where later keys win.
    fn pressed_key(&self) -> Option<u8> {
        self.key_state.iter().rposition(|&pressed| pressed).map(|k| k as u8)
    }

    fn resume_key_wait(&mut self, register: usize) {
        if let Some(key) = self.pressed_key() {
            self.v_registers[register] = key;
            self.awaiting_key = None;
            self.pc_register += 2;
        }
    }

    fn execute(&mut self, instruction: Instruction) -> Result<PcUpdate, Chip8Error> {
        let update = match instruction {
            Instruction::Sys(addr) => {
                log::debug!("Ignoring SYS {:#05x} at {:#05x}", addr, self.pc_register);
                PcUpdate::Next
            }
            Instruction::Cls => {
                self.screen_buffer = [0; SCREEN_WIDTH * SCREEN_HEIGHT];
                self.screen_dirty = true;
                PcUpdate::Next
            }
            Instruction::Ret => self.instr_ret()?,
            Instruction::Jump(addr) => PcUpdate::JumpTo(addr),
            Instruction::Call(addr) => self.instr_call(addr)?,
            Instruction::SkipEqImm(x, kk) => Cpu::skip_if(self.v_registers[x] == kk),
            Instruction::SkipNeImm(x, kk) => Cpu::skip_if(self.v_registers[x] != kk),
            Instruction::SkipEqReg(x, y) => {
                Cpu::skip_if(self.v_registers[x] == self.v_registers[y])
            }
            Instruction::LoadImm(x, kk) => {
                self.v_registers[x] = kk;
                PcUpdate::Next
            }
            Instruction::AddImm(x, kk) => {
                // No carry flag, unlike `8xy4`
                self.v_registers[x] = self.v_registers[x].wrapping_add(kk);
                PcUpdate::Next
            }
            Instruction::Move(x, y) => {
                self.v_registers[x] = self.v_registers[y];
                PcUpdate::Next
            }
            Instruction::Or(x, y) => {
                self.v_registers[x] |= self.v_registers[y];
                PcUpdate::Next
            }
            Instruction::And(x, y) => {
                self.v_registers[x] &= self.v_registers[y];
                PcUpdate::Next
            }
            Instruction::Xor(x, y) => {
                self.v_registers[x] ^= self.v_registers[y];
                PcUpdate::Next
            }
            Instruction::AddReg(x, y) => {
                let (sum, carry) = self.v_registers[x].overflowing_add(self.v_registers[y]);
                // VF is written last so the flag survives when x is F
                self.v_registers[x] = sum;
                self.v_registers[0xF] = carry as u8;
                PcUpdate::Next
            }
            Instruction::Sub(x, y) => {
                let (vx, vy) = (self.v_registers[x], self.v_registers[y]);
                self.v_registers[x] = vx.wrapping_sub(vy);
                self.v_registers[0xF] = (vx > vy) as u8;
                PcUpdate::Next
            }
            Instruction::SubReversed(x, y) => {
                let (vx, vy) = (self.v_registers[x], self.v_registers[y]);
                self.v_registers[x] = vy.wrapping_sub(vx);
                self.v_registers[0xF] = (vy >= vx) as u8;
                PcUpdate::Next
            }
            Instruction::ShiftRight(x, y) => self.instr_shift(x, y, |v| (v >> 1, v & 1)),
            Instruction::ShiftLeft(x, y) => self.instr_shift(x, y, |v| (v << 1, v >> 7)),
            Instruction::SkipNeReg(x, y) => {
                Cpu::skip_if(self.v_registers[x] != self.v_registers[y])
            }
            Instruction::LoadI(addr) => {
                self.i_register = addr;
                PcUpdate::Next
            }
            Instruction::JumpV0(addr) => {
                // The computed target is advanced like any other instruction, so execution
                // resumes one instruction past nnn + V0.
                PcUpdate::JumpTo(addr + self.v_registers[0] as u16 + 2)
            }
            Instruction::Random(x, kk) => {
                self.v_registers[x] = self.rng.gen::<u8>() & kk;
                PcUpdate::Next
            }
            Instruction::Draw(x, y, height) => self.instr_draw(x, y, height)?,
            Instruction::SkipKeyPressed(x) => Cpu::skip_if(self.is_key_pressed(self.v_registers[x])),
            Instruction::SkipKeyNotPressed(x) => {
                Cpu::skip_if(!self.is_key_pressed(self.v_registers[x]))
            }
            Instruction::LoadDelay(x) => {
                self.v_registers[x] = self.dt_register;
                PcUpdate::Next
            }
            Instruction::WaitKey(x) => match self.pressed_key() {
                Some(key) => {
                    self.v_registers[x] = key;
                    PcUpdate::Next
                }
                None => {
                    self.awaiting_key = Some(x);
                    PcUpdate::Hold
                }
            },
            Instruction::SetDelay(x) => {
                self.dt_register = self.v_registers[x];
                PcUpdate::Next
            }
            Instruction::SetSound(x) => {
                self.st_register = self.v_registers[x];
                PcUpdate::Next
            }
            Instruction::AddI(x) => {
                self.i_register = self.i_register.wrapping_add(self.v_registers[x] as u16);
                PcUpdate::Next
            }
            Instruction::LoadFont(x) => {
                // We store the font sprites at address 0, and each sprite takes up 5 bytes.
                self.i_register = self.v_registers[x] as u16 * FONT_SPRITE_LEN as u16;
                PcUpdate::Next
            }
            Instruction::StoreBcd(x) => self.instr_store_bcd(x)?,
            Instruction::StoreRegs(x) => self.instr_store_regs(x)?,
            Instruction::LoadRegs(x) => self.instr_load_regs(x)?,
            Instruction::Unknown(word) => {
                log::warn!("Unknown opcode {:#06X} at {:#05x}", word, self.pc_register);
                PcUpdate::Next
            }
        };
        Ok(update)
    }

    /// Execute `RET` instruction
    fn instr_ret(&mut self) -> Result<PcUpdate, Chip8Error> {
        if self.sp_register == 0 {
            return Err(Chip8Error::StackUnderflow);
        }

        // Reclaim top of stack. The stored address is the call-site, so advance past it.
        self.sp_register -= 1;
        Ok(PcUpdate::JumpTo(
            self.call_stack[self.sp_register as usize] + 2,
        ))
    }

    /// Execute `CALL addr` instruction
    fn instr_call(&mut self, addr: u16) -> Result<PcUpdate, Chip8Error> {
        if self.sp_register as usize >= STACK_DEPTH {
            return Err(Chip8Error::StackOverflow);
        }

        self.call_stack[self.sp_register as usize] = self.pc_register;
        self.sp_register += 1;
        Ok(PcUpdate::JumpTo(addr))
    }

    /// Execute `SHR`/`SHL`. `op` returns the shifted value and the bit shifted out.
    fn instr_shift(&mut self, x: usize, y: usize, op: fn(u8) -> (u8, u8)) -> PcUpdate {
        let source = if self.quirks.shift_uses_vy { y } else { x };
        let (shifted, lost_bit) = op(self.v_registers[source]);
        self.v_registers[x] = shifted;
        if self.quirks.shift_sets_vf {
            self.v_registers[0xF] = lost_bit;
        }
        PcUpdate::Next
    }

    /// Execute `DRW Vx, Vy, nibble` instruction
    fn instr_draw(&mut self, x: usize, y: usize, height: u8) -> Result<PcUpdate, Chip8Error> {
        let height = height as usize;
        let base = self.check_block(height)?;
        let sprite_x = self.v_registers[x] as usize;
        let sprite_y = self.v_registers[y] as usize;

        // Coordinates are neither wrapped nor clipped: a sprite running off the right edge
        // continues on the next row, and pixels past the end of the screen are dropped.
        let mut collision = false;
        for row in 0..height {
            // A sprite is a bit-packed bitmap with the MSB as the leftmost pixel
            let sprite_row = self.memory[base + row];
            for col in 0..8 {
                if sprite_row & (0x80 >> col) == 0 {
                    continue;
                }
                let index = sprite_x + col + (sprite_y + row) * SCREEN_WIDTH;
                if let Some(pixel) = self.screen_buffer.get_mut(index) {
                    if *pixel == 1 {
                        collision = true;
                    }
                    *pixel ^= 1;
                }
            }
        }

        // When drawing sprites, VF acts as collision flag
        self.v_registers[0xF] = collision as u8;
        self.screen_dirty = true;
        Ok(PcUpdate::Next)
    }

    /// Start address of a `len` byte block at I, if it lies entirely within memory.
    fn check_block(&self, len: usize) -> Result<usize, Chip8Error> {
        let base = self.i_register as usize;
        if len > 0 && base + len > MEM_SIZE {
            return Err(Chip8Error::MemoryOutOfBounds {
                address: base + len - 1,
            });
        }
        Ok(base)
    }

    /// Execute `LD B, Vx` instruction
    fn instr_store_bcd(&mut self, x: usize) -> Result<PcUpdate, Chip8Error> {
        let base = self.check_block(3)?;
        let value = self.v_registers[x];
        self.memory[base] = value / 100;
        self.memory[base + 1] = (value / 10) % 10;
        self.memory[base + 2] = value % 10;
        Ok(PcUpdate::Next)
    }

    /// Execute `LD [I], Vx` instruction
    fn instr_store_regs(&mut self, last_reg: usize) -> Result<PcUpdate, Chip8Error> {
        let base = self.check_block(last_reg + 1)?;
        self.memory[base..=base + last_reg].copy_from_slice(&self.v_registers[..=last_reg]);
        self.advance_i_after_block(last_reg);
        Ok(PcUpdate::Next)
    }

    /// Execute `LD Vx, [I]` instruction
    fn instr_load_regs(&mut self, last_reg: usize) -> Result<PcUpdate, Chip8Error> {
        let base = self.check_block(last_reg + 1)?;
        self.v_registers[..=last_reg].copy_from_slice(&self.memory[base..=base + last_reg]);
        self.advance_i_after_block(last_reg);
        Ok(PcUpdate::Next)
    }

    fn advance_i_after_block(&mut self, last_reg: usize) {
        if self.quirks.load_store_increments_i {
            self.i_register = self.i_register.wrapping_add(last_reg as u16 + 1);
        }
    }
}

impl Default for Cpu {
    fn default() -> Self {
        Cpu::new()
    }
}
