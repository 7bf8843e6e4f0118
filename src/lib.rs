mod cpu;
mod error;
mod instruction;
mod quirks;
mod utils;

use wasm_bindgen::prelude::*;

pub use cpu::Cpu;
pub use error::Chip8Error;
pub use instruction::Instruction;
pub use quirks::Quirks;

pub const MEM_SIZE: usize = 4096;
/// The first 512 bytes belong to the interpreter; programs are loaded and start right after.
pub const MEM_RESERVED: usize = 512;
pub const SCREEN_WIDTH: usize = 64;
pub const SCREEN_HEIGHT: usize = 32;
pub const STACK_DEPTH: usize = 16;
pub const KEY_COUNT: usize = 16;

pub const FONT_SPRITE_LEN: usize = 5;
/// 4x5 sprites for the hex digits 0-F, stored at address 0.
pub const FONT_SPRITES: [u8; FONT_SPRITE_LEN * 16] = [
    0xF0, 0x90, 0x90, 0x90, 0xF0, // '0'
    0x20, 0x60, 0x20, 0x20, 0x70, // '1'
    0xF0, 0x10, 0xF0, 0x80, 0xF0, // '2'
    0xF0, 0x10, 0xF0, 0x10, 0xF0, // '3'
    0x90, 0x90, 0xF0, 0x10, 0x10, // '4'
    0xF0, 0x80, 0xF0, 0x10, 0xF0, // '5'
    0xF0, 0x80, 0xF0, 0x90, 0xF0, // '6'
    0xF0, 0x10, 0x20, 0x40, 0x40, // '7'
    0xF0, 0x90, 0xF0, 0x90, 0xF0, // '8'
    0xF0, 0x90, 0xF0, 0x10, 0xF0, // '9'
    0xF0, 0x90, 0xF0, 0x90, 0x90, // 'A'
    0xE0, 0x90, 0xE0, 0x90, 0xE0, // 'B'
    0xF0, 0x80, 0x80, 0x80, 0xF0, // 'C'
    0xE0, 0x90, 0x90, 0x90, 0xE0, // 'D'
    0xF0, 0x80, 0xF0, 0x80, 0xF0, // 'E'
    0xF0, 0x80, 0xF0, 0x80, 0x80, // 'F'
];

#[wasm_bindgen]
/// Browser-facing wrapper around `Cpu`. Errors are handed to JS as strings.
pub struct Emulator {
    cpu: Cpu,
}

#[wasm_bindgen]
impl Emulator {
    /// Construct an emulator at the initial entry state with the default quirks.
    #[wasm_bindgen(constructor)]
    pub fn new() -> Self {
        Emulator::with_quirks(false, false)
    }

    /// When `shift_uses_vy` is true, the shift instructions shift Vy instead of Vx.
    /// When `shift_sets_vf` is true, the shift instructions store the shifted-out bit in VF.
    pub fn with_quirks(shift_uses_vy: bool, shift_sets_vf: bool) -> Self {
        utils::set_panic_hook();
        utils::init_console_logger();

        let quirks = Quirks {
            shift_uses_vy,
            shift_sets_vf,
            ..Quirks::default()
        };
        Emulator {
            cpu: Cpu::with_quirks(quirks),
        }
    }

    pub fn reset(&mut self) {
        self.cpu.reset();
    }

    /// Copy rom bytes to memory at the entry point.
    pub fn load_program(&mut self, rom: &[u8]) -> Result<(), JsValue> {
        self.cpu.load_program(rom).map_err(to_js_error)
    }

    /// Execute one instruction. An error means the program has crashed and the host should stop
    /// stepping.
    pub fn step(&mut self) -> Result<(), JsValue> {
        self.cpu.step().map_err(to_js_error)
    }

    /// Execute up to `count` instructions, stopping at the first error.
    pub fn run_steps(&mut self, count: u32) -> Result<(), JsValue> {
        for _ in 0..count {
            self.cpu.step().map_err(to_js_error)?;
        }
        Ok(())
    }

    /// Get a pointer to the screen buffer memory, used from the JS side to render the screen.
    pub fn get_screen_buffer(&self) -> *const u8 {
        self.cpu.framebuffer().as_ptr()
    }

    pub fn screen_buffer_len(&self) -> usize {
        SCREEN_WIDTH * SCREEN_HEIGHT
    }

    /// Returns whether or not the screen is dirty, and if it is, sets it to false.
    pub fn handle_screen_dirty_flag(&mut self) -> bool {
        self.cpu.consume_dirty_flag()
    }

    /// Update the state of key `index` (0-15).
    pub fn set_key(&mut self, index: usize, pressed: bool) -> Result<(), JsValue> {
        self.cpu.set_key(index, pressed).map_err(to_js_error)
    }

    /// Returns true if the emulator should play a tone
    pub fn should_play_tone(&self) -> bool {
        self.cpu.sound_active()
    }

    /// Returns true once after the sound timer runs out.
    pub fn take_tone_event(&mut self) -> bool {
        self.cpu.consume_tone_flag()
    }

    /// Returns true if the cpu is waiting for a key press.
    pub fn is_waiting_for_keypress(&self) -> bool {
        self.cpu.is_waiting_for_keypress()
    }

    pub fn pc(&self) -> u16 {
        self.cpu.pc()
    }
}

impl Default for Emulator {
    fn default() -> Self {
        Emulator::new()
    }
}

fn to_js_error(err: Chip8Error) -> JsValue {
    JsValue::from_str(&err.to_string())
}
