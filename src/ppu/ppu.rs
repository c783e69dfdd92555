//! 2C02-style PPU: register file, VRAM/OAM state, and frame-granular rendering.
//!
//! Registers $2000–$2007 (mirrored every 8 bytes) follow the
//! [PPU scrolling](https://www.nesdev.org/wiki/PPU_scrolling) v/t/x/w model. Rendering happens
//! once per frame: the whole 2×2 nametable area is composed into a 512×480 background buffer,
//! all 64 sprites into a 256×240 sprite buffer, and the visible frame is cropped from those.

use tracing::debug;

use crate::{
    cartridge::{cartridge::Cartridge, mapper::Mirroring},
    error::MapperError,
};

/// 2C02-style 64-color palette (0xRRGGBB). Indexed by a 6-bit palette RAM value.
pub const NES_PALETTE_RGB: [u32; 64] = [
    0x545454, 0x001E74, 0x081090, 0x300088, 0x440064, 0x5C0030, 0x540400, 0x3C1800, 0x202A00,
    0x083A00, 0x004000, 0x003C00, 0x00302C, 0x000000, 0x000000, 0x000000, 0x989698, 0x084CC4,
    0x3032EC, 0x5C1EE4, 0x8814B0, 0xA01464, 0x982220, 0x783C00, 0x545A00, 0x287200, 0x087C00,
    0x007628, 0x006678, 0x000000, 0x000000, 0x000000, 0xECEEEC, 0x3C7EEC, 0x5C5CEC, 0x8844EC,
    0xB02CEC, 0xE028B0, 0xD83C50, 0xC45400, 0xAC7000, 0x808800, 0x409C30, 0x20A458, 0x209A88,
    0x404040, 0x000000, 0x000000, 0xECEEEC, 0xA8BCEC, 0xBCACEC, 0xD4A0EC, 0xEC94EC, 0xEC90D4,
    0xEC9CB4, 0xE4B090, 0xDCC878, 0xD4DC78, 0xB8EC98, 0xA8ECBC, 0xA0E4E4, 0xA0A0A0, 0x000000,
    0x000000,
];

pub const SCREEN_WIDTH: usize = 256;
pub const SCREEN_HEIGHT: usize = 240;
/// Background buffer covers all four logical nametables.
pub const BACKGROUND_WIDTH: usize = SCREEN_WIDTH * 2;
pub const BACKGROUND_HEIGHT: usize = SCREEN_HEIGHT * 2;

/// OAM (Object Attribute Memory): 64 sprites × 4 bytes. Each entry: Y, tile, attr, X.
pub const OAM_LEN: usize = 256;
pub const NAMETABLE_SIZE: usize = 0x400;

/// 512 tiles (both pattern tables) × 8×8 pixels.
const TILE_COUNT: usize = 512;
const TILE_PIXELS: usize = 64;

// PPUCTRL
const CTRL_INCREMENT_32: u8 = 0x04;
const CTRL_SPRITE_TABLE: u8 = 0x08;
const CTRL_BACKGROUND_TABLE: u8 = 0x10;
const CTRL_SPRITE_16: u8 = 0x20;
const CTRL_NMI_ENABLE: u8 = 0x80;
// PPUMASK
const MASK_SHOW_BACKGROUND: u8 = 0x08;
const MASK_SHOW_SPRITES: u8 = 0x10;
// PPUSTATUS
const STATUS_SPRITE_0_HIT: u8 = 0x40;
const STATUS_VBLANK: u8 = 0x80;

/// PPU state: registers, scroll latch, nametables, palette, OAM, tile cache, and output buffers.
pub struct PPU {
    pub ctrl: u8,
    pub mask: u8,
    pub status: u8,
    /// Current VRAM address (15 bits).
    pub v: u16,
    /// Temporary VRAM address (15 bits); the top-left scroll position.
    pub t: u16,
    pub fine_x: u8,
    /// Write toggle shared by $2005 and $2006.
    pub w: bool,
    /// Scroll in pixels, derived from `t`/`fine_x` on the second $2005 write.
    pub scroll_x: u16,
    pub scroll_y: u16,
    /// Last value written to (or read from) a register; reads of write-only registers return it.
    data_latch: u8,
    /// $2007 read buffer.
    read_buffer: u8,
    nametables: [[u8; NAMETABLE_SIZE]; 2],
    mirroring: Mirroring,
    /// Palette RAM $3F00-$3F1F.
    pub palette: [u8; 32],
    pub oam: [u8; OAM_LEN],
    pub oam_addr: u8,
    /// Decoded pattern tiles: `tiles[tile * 64 + y * 8 + x]` is a 2-bit pixel index.
    tiles: Vec<u8>,
    /// Sprite 0 overlapped opaque background in the last composed frame.
    sprite_0_overlap: bool,
    background: Vec<u8>,
    sprites: Vec<u8>,
    frame: Vec<u32>,
}

impl PPU {
    pub fn new() -> Self {
        Self {
            ctrl: 0,
            mask: 0,
            status: 0,
            v: 0,
            t: 0,
            fine_x: 0,
            w: false,
            scroll_x: 0,
            scroll_y: 0,
            data_latch: 0,
            read_buffer: 0,
            nametables: [[0; NAMETABLE_SIZE]; 2],
            mirroring: Mirroring::Horizontal,
            palette: [0; 32],
            oam: [0; OAM_LEN],
            oam_addr: 0,
            tiles: vec![0; TILE_COUNT * TILE_PIXELS],
            sprite_0_overlap: false,
            background: vec![0; BACKGROUND_WIDTH * BACKGROUND_HEIGHT * 4],
            sprites: vec![0; SCREEN_WIDTH * SCREEN_HEIGHT * 4],
            frame: vec![0; SCREEN_WIDTH * SCREEN_HEIGHT],
        }
    }

    /// Return to power-on state and adopt a new cartridge's mirroring and tiles.
    pub fn reset(&mut self, cart: &Cartridge) {
        *self = Self::new();
        self.mirroring = cart.mirroring();
        self.load_pattern_tables(cart);
    }

    pub fn mirroring(&self) -> Mirroring {
        self.mirroring
    }

    pub fn set_mirroring(&mut self, mirroring: Mirroring) {
        self.mirroring = mirroring;
    }

    // ------------------------------------------------------------------
    // Tile cache
    // ------------------------------------------------------------------

    /// Decode every tile of both pattern tables from CHR.
    pub fn load_pattern_tables(&mut self, cart: &Cartridge) {
        for tile in 0..TILE_COUNT {
            for row in 0..8 {
                self.decode_tile_row(cart, tile, row);
            }
        }
    }

    fn decode_tile_row(&mut self, cart: &Cartridge, tile: usize, row: usize) {
        let addr = (tile * 16 + row) as u16;
        let plane0 = cart.ppu_read(addr);
        let plane1 = cart.ppu_read(addr + 8);
        let base = tile * TILE_PIXELS + row * 8;
        for x in 0..8 {
            let bit = 7 - x;
            let low = (plane0 >> bit) & 1;
            let high = (plane1 >> bit) & 1;
            self.tiles[base + x] = (high << 1) | low;
        }
    }

    /// Decoded 2-bit pixel of `tile` (0..512) at (x, y).
    pub fn tile_pixel(&self, tile: usize, x: usize, y: usize) -> u8 {
        self.tiles[tile * TILE_PIXELS + y * 8 + x]
    }

    // ------------------------------------------------------------------
    // Register interface ($2000-$2007)
    // ------------------------------------------------------------------

    /// CPU read of a PPU register; `addr` is any mirror in $2000–$3FFF.
    pub fn read_register(&mut self, addr: u16, cart: Option<&Cartridge>) -> u8 {
        let value = match addr & 7 {
            2 => self.read_status(),
            4 => self.read_oam_data(),
            7 => self.read_data(cart),
            reg => {
                debug!("read of write-only PPU register ${:04X}", 0x2000 + reg);
                return self.data_latch;
            }
        };
        self.data_latch = value;
        value
    }

    /// CPU write of a PPU register; `addr` is any mirror in $2000–$3FFF.
    pub fn write_register(
        &mut self,
        addr: u16,
        data: u8,
        cart: Option<&mut Cartridge>,
    ) -> Result<(), MapperError> {
        self.data_latch = data;
        match addr & 7 {
            0 => self.write_ctrl(data),
            1 => self.write_mask(data),
            2 => debug!("write ${:02X} to read-only PPUSTATUS", data),
            3 => self.write_oam_addr(data),
            4 => self.write_oam_data(data),
            5 => self.write_scroll(data),
            6 => self.write_addr(data),
            _ => return self.write_data(cart, data),
        }
        Ok(())
    }

    /// Write PPUCTRL ($2000). Nametable select also lands in t bits 10–11.
    pub fn write_ctrl(&mut self, data: u8) {
        self.ctrl = data;
        self.t = (self.t & !0x0C00) | (((data & 0x03) as u16) << 10);
    }

    /// Write PPUMASK ($2001).
    pub fn write_mask(&mut self, data: u8) {
        self.mask = data;
    }

    /// Read PPUSTATUS ($2002); clears vblank and the write toggle. Low bits are stale bus.
    pub fn read_status(&mut self) -> u8 {
        let value = (self.status & 0xE0) | (self.data_latch & 0x1F);
        self.status &= !STATUS_VBLANK;
        self.w = false;
        value
    }

    /// Write OAMADDR ($2003).
    pub fn write_oam_addr(&mut self, data: u8) {
        self.oam_addr = data;
    }

    /// Read OAMDATA ($2004); does not increment OAMADDR.
    pub fn read_oam_data(&mut self) -> u8 {
        self.oam[self.oam_addr as usize]
    }

    /// Write OAMDATA ($2004); writes OAM and increments OAMADDR.
    pub fn write_oam_data(&mut self, data: u8) {
        self.oam[self.oam_addr as usize] = data;
        self.oam_addr = self.oam_addr.wrapping_add(1);
    }

    /// Write PPUSCROLL ($2005): first write = coarse X and fine X, second = coarse Y and fine Y.
    pub fn write_scroll(&mut self, data: u8) {
        if !self.w {
            self.t = (self.t & !0x001F) | (data >> 3) as u16;
            self.fine_x = data & 0x07;
            self.w = true;
        } else {
            self.t = (self.t & !0x73E0)
                | (((data & 0x07) as u16) << 12)
                | (((data & 0xF8) as u16) << 2);
            self.w = false;
            self.update_scroll();
        }
    }

    /// Write PPUADDR ($2006): high six bits then low byte; the second write copies t into v.
    pub fn write_addr(&mut self, data: u8) {
        if !self.w {
            self.t = (self.t & 0x00FF) | (((data & 0x3F) as u16) << 8);
            self.w = true;
        } else {
            self.t = (self.t & 0xFF00) | data as u16;
            self.v = self.t;
            self.w = false;
        }
    }

    fn update_scroll(&mut self) {
        let coarse_x = self.t & 0x1F;
        let coarse_y = (self.t >> 5) & 0x1F;
        let fine_y = (self.t >> 12) & 0x07;
        self.scroll_x = (coarse_x << 3) | self.fine_x as u16;
        self.scroll_y = (coarse_y << 3) | fine_y;
    }

    fn increment_v(&mut self) {
        let step = if self.ctrl & CTRL_INCREMENT_32 != 0 { 32 } else { 1 };
        self.v = self.v.wrapping_add(step) & 0x7FFF;
    }

    /// Read PPUDATA ($2007). Below the palette the result is the previous buffered byte.
    pub fn read_data(&mut self, cart: Option<&Cartridge>) -> u8 {
        let addr = self.v & 0x3FFF;
        let value = if addr >= 0x3F00 {
            // Palette reads are immediate; the buffer gets the nametable byte underneath.
            self.read_buffer = self.read_vram(addr - 0x1000, cart);
            self.read_vram(addr, cart)
        } else {
            let buffered = self.read_buffer;
            self.read_buffer = self.read_vram(addr, cart);
            buffered
        };
        self.increment_v();
        value
    }

    /// Write PPUDATA ($2007) at v, then increment v by 1 or 32.
    pub fn write_data(
        &mut self,
        cart: Option<&mut Cartridge>,
        data: u8,
    ) -> Result<(), MapperError> {
        let addr = self.v & 0x3FFF;
        self.increment_v();
        self.write_vram(addr, data, cart)
    }

    /// Copy one 256-byte page into OAM (OAM-DMA from $4014), starting at OAMADDR.
    pub fn oam_dma(&mut self, page: &[u8]) {
        for (i, &byte) in page.iter().take(OAM_LEN).enumerate() {
            let index = self.oam_addr.wrapping_add(i as u8) as usize;
            self.oam[index] = byte;
        }
    }

    // ------------------------------------------------------------------
    // PPU address space
    // ------------------------------------------------------------------

    /// Read the 14-bit PPU address space.
    pub fn read_vram(&self, addr: u16, cart: Option<&Cartridge>) -> u8 {
        let addr = addr & 0x3FFF;
        match addr {
            0x0000..=0x1FFF => cart.map_or(0, |c| c.ppu_read(addr)),
            0x2000..=0x3EFF => {
                let (bank, offset) = Self::map_nametable_addr(addr, self.mirroring);
                self.nametables[bank][offset]
            }
            _ => self.palette[Self::palette_index(addr)],
        }
    }

    /// Write the 14-bit PPU address space. Pattern writes go to the mapper.
    pub fn write_vram(
        &mut self,
        addr: u16,
        data: u8,
        cart: Option<&mut Cartridge>,
    ) -> Result<(), MapperError> {
        let addr = addr & 0x3FFF;
        match addr {
            0x0000..=0x1FFF => {
                if let Some(cart) = cart {
                    cart.ppu_write(addr, data)?;
                    let tile = addr as usize / 16;
                    let row = addr as usize % 8;
                    self.decode_tile_row(cart, tile, row);
                }
            }
            0x2000..=0x3EFF => {
                let (bank, offset) = Self::map_nametable_addr(addr, self.mirroring);
                self.nametables[bank][offset] = data;
            }
            _ => self.palette[Self::palette_index(addr)] = data & 0x3F,
        }
        Ok(())
    }

    /// Physical bank (0 or 1) holding logical nametable `table` (0..4).
    pub fn nametable_bank(table: u16, mirroring: Mirroring) -> usize {
        match mirroring {
            Mirroring::Vertical => (table & 1) as usize,
            Mirroring::Horizontal => ((table >> 1) & 1) as usize,
        }
    }

    /// Map a nametable address ($2000–$3EFF) to (bank, offset).
    pub fn map_nametable_addr(addr: u16, mirroring: Mirroring) -> (usize, usize) {
        let addr = (addr - 0x2000) & 0x0FFF;
        let table = addr / NAMETABLE_SIZE as u16;
        let offset = (addr as usize) & (NAMETABLE_SIZE - 1);
        (Self::nametable_bank(table, mirroring), offset)
    }

    /// Resolve a palette address to its 32-byte index.
    /// $3F10/$3F14/$3F18/$3F1C mirror $3F00/$3F04/$3F08/$3F0C.
    fn palette_index(addr: u16) -> usize {
        let i = (addr & 0x1F) as usize;
        if i & 0x13 == 0x10 { i & 0x0F } else { i }
    }

    // ------------------------------------------------------------------
    // Frame timing
    // ------------------------------------------------------------------

    /// Enter vblank: set the status flag and compose this frame's buffers.
    /// Returns true when PPUCTRL asks for an NMI.
    pub fn begin_vblank(&mut self) -> bool {
        self.status |= STATUS_VBLANK;
        self.status &= !STATUS_SPRITE_0_HIT;
        self.render();
        self.ctrl & CTRL_NMI_ENABLE != 0
    }

    /// Leave vblank (pre-render line). Sprite 0 hit is reported for the upcoming frame
    /// if sprite 0 overlapped the background last time.
    pub fn end_vblank(&mut self) {
        self.status &= !STATUS_VBLANK;
        if self.sprite_0_overlap {
            self.status |= STATUS_SPRITE_0_HIT;
        }
    }

    pub fn in_vblank(&self) -> bool {
        self.status & STATUS_VBLANK != 0
    }

    // ------------------------------------------------------------------
    // Rendering
    // ------------------------------------------------------------------

    /// Compose background, sprites, and the visible frame.
    pub fn render(&mut self) {
        self.render_background();
        self.render_sprites();
        self.compose();
    }

    fn color(&self, palette_addr: usize) -> u32 {
        NES_PALETTE_RGB[(self.palette[palette_addr] & 0x3F) as usize]
    }

    fn put_rgba(buffer: &mut [u8], index: usize, rgb: u32, alpha: u8) {
        let px = &mut buffer[index * 4..index * 4 + 4];
        px[0] = (rgb >> 16) as u8;
        px[1] = (rgb >> 8) as u8;
        px[2] = rgb as u8;
        px[3] = alpha;
    }

    /// Compose all four logical nametables into the 512×480 background buffer.
    pub fn render_background(&mut self) {
        let backdrop = self.color(0);
        if self.mask & MASK_SHOW_BACKGROUND == 0 {
            for i in 0..BACKGROUND_WIDTH * BACKGROUND_HEIGHT {
                Self::put_rgba(&mut self.background, i, backdrop, 0xFF);
            }
            return;
        }

        let tile_base = if self.ctrl & CTRL_BACKGROUND_TABLE != 0 { 256 } else { 0 };
        let mut background = std::mem::take(&mut self.background);

        for table in 0..4u16 {
            let bank = &self.nametables[Self::nametable_bank(table, self.mirroring)];
            let origin_x = (table as usize & 1) * SCREEN_WIDTH;
            let origin_y = (table as usize >> 1) * SCREEN_HEIGHT;

            for tile_y in 0..30 {
                for tile_x in 0..32 {
                    let tile = tile_base + bank[tile_y * 32 + tile_x] as usize;
                    let attr = bank[0x3C0 + (tile_y / 4) * 8 + tile_x / 4];
                    let shift = ((tile_y & 2) << 1) | (tile_x & 2);
                    let sub_palette = ((attr >> shift) & 0x03) as usize;

                    for y in 0..8 {
                        for x in 0..8 {
                            let pixel = self.tiles[tile * TILE_PIXELS + y * 8 + x] as usize;
                            let rgb = if pixel == 0 {
                                backdrop
                            } else {
                                self.color(sub_palette * 4 + pixel)
                            };
                            let px = origin_x + tile_x * 8 + x;
                            let py = origin_y + tile_y * 8 + y;
                            Self::put_rgba(&mut background, py * BACKGROUND_WIDTH + px, rgb, 0xFF);
                        }
                    }
                }
            }
        }

        self.background = background;
    }

    /// Compose all 64 sprites into the 256×240 sprite buffer. Transparent pixels have alpha 0.
    /// No per-scanline limit and no priority bit; OAM index 0 is drawn last.
    pub fn render_sprites(&mut self) {
        self.sprites.fill(0);
        self.sprite_0_overlap = false;
        if self.mask & MASK_SHOW_SPRITES == 0 {
            return;
        }

        let tall = self.ctrl & CTRL_SPRITE_16 != 0;
        let height = if tall { 16 } else { 8 };
        let table = if self.ctrl & CTRL_SPRITE_TABLE != 0 { 256 } else { 0 };
        let mut sprites = std::mem::take(&mut self.sprites);

        for index in (0..64).rev() {
            let entry = &self.oam[index * 4..index * 4 + 4];
            let top = entry[0] as usize + 1;
            let tile_id = entry[1] as usize;
            let attr = entry[2];
            let left = entry[3] as usize;

            let flip_v = attr & 0x80 != 0;
            let flip_h = attr & 0x40 != 0;
            let palette_base = 0x10 + (attr & 0x03) as usize * 4;

            for row in 0..height {
                let screen_y = top + row;
                if screen_y >= SCREEN_HEIGHT {
                    break;
                }
                let src_row = if flip_v { height - 1 - row } else { row };
                let tile = if tall {
                    (tile_id & 1) * 256 + (tile_id & 0xFE) + src_row / 8
                } else {
                    table + tile_id
                };

                for col in 0..8 {
                    let screen_x = left + col;
                    if screen_x >= SCREEN_WIDTH {
                        break;
                    }
                    let src_col = if flip_h { 7 - col } else { col };
                    let offset = tile * TILE_PIXELS + (src_row % 8) * 8 + src_col;
                    let pixel = self.tiles[offset] as usize;
                    if pixel == 0 {
                        continue;
                    }
                    let rgb = self.color(palette_base + pixel);
                    Self::put_rgba(&mut sprites, screen_y * SCREEN_WIDTH + screen_x, rgb, 0xFF);

                    if index == 0 && self.background_opaque(screen_x, screen_y) {
                        self.sprite_0_overlap = true;
                    }
                }
            }
        }

        self.sprites = sprites;
    }

    /// Whether the scrolled background pixel at a screen position is non-backdrop.
    fn background_opaque(&self, screen_x: usize, screen_y: usize) -> bool {
        if self.mask & MASK_SHOW_BACKGROUND == 0 {
            return false;
        }
        let (bx, by) = self.background_origin();
        let x = (bx + screen_x) % BACKGROUND_WIDTH;
        let y = (by + screen_y) % BACKGROUND_HEIGHT;
        let table = ((y / SCREEN_HEIGHT) << 1 | (x / SCREEN_WIDTH)) as u16;
        let (lx, ly) = (x % SCREEN_WIDTH, y % SCREEN_HEIGHT);
        let bank = &self.nametables[Self::nametable_bank(table, self.mirroring)];
        let tile_base = if self.ctrl & CTRL_BACKGROUND_TABLE != 0 { 256 } else { 0 };
        let tile = tile_base + bank[(ly / 8) * 32 + lx / 8] as usize;
        self.tiles[tile * TILE_PIXELS + (ly % 8) * 8 + lx % 8] != 0
    }

    /// Top-left of the visible window inside the background buffer.
    fn background_origin(&self) -> (usize, usize) {
        let x = self.scroll_x as usize + (self.ctrl & 0x01) as usize * SCREEN_WIDTH;
        let y = self.scroll_y as usize + ((self.ctrl >> 1) & 0x01) as usize * SCREEN_HEIGHT;
        (x, y)
    }

    /// Crop the background at the scroll position (wrapping) and overlay opaque sprites.
    fn compose(&mut self) {
        let (origin_x, origin_y) = self.background_origin();
        for y in 0..SCREEN_HEIGHT {
            let by = (origin_y + y) % BACKGROUND_HEIGHT;
            for x in 0..SCREEN_WIDTH {
                let sprite = &self.sprites[(y * SCREEN_WIDTH + x) * 4..][..4];
                let px = if sprite[3] != 0 {
                    sprite
                } else {
                    let bx = (origin_x + x) % BACKGROUND_WIDTH;
                    &self.background[(by * BACKGROUND_WIDTH + bx) * 4..][..4]
                };
                self.frame[y * SCREEN_WIDTH + x] =
                    ((px[0] as u32) << 16) | ((px[1] as u32) << 8) | px[2] as u32;
            }
        }
    }

    /// 512×480 RGBA background buffer from the last rendered frame.
    pub fn background_buffer(&self) -> &[u8] {
        &self.background
    }

    /// 256×240 RGBA sprite buffer from the last rendered frame.
    pub fn sprite_buffer(&self) -> &[u8] {
        &self.sprites
    }

    /// 256×240 0RGB frame ready for display.
    pub fn composite_frame(&self) -> &[u32] {
        &self.frame
    }
}

impl Default for PPU {
    fn default() -> Self {
        Self::new()
    }
}
