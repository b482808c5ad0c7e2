//! Core 1 entry point and the PWM+DMA binding for the DDS synthesis
//! engine (§4.2/§4.3).
//!
//! RP2040 has no hardware double-buffer-with-interrupt primitive at the
//! level `rp2040-hal`'s `dma` module targets (its `double_buffer` config
//! is built for one-shot transfers, not an endlessly repeating,
//! CPU-refilled ring) -- so this binds the DMA channels directly the way
//! the teacher's own register-level timer code (now superseded, but kept
//! in spirit) bypasses its HAL abstraction when the abstraction doesn't
//! reach far enough. Each PWM slice pair gets one DMA channel, read-ring
//! enabled over a buffer twice `DDS_BUFFER_SIZE` long and `chain_to`
//! itself, so the hardware replays the ring forever without the CPU ever
//! re-arming a trigger; Core 1's only job is to watch the channel's
//! live read-address register and refill whichever half it isn't
//! currently reading from, via [`dsp::DdsEngine::refill`].
use dsp::design_parameters::{DDS_BUFFER_SIZE, PWM_COMPARE_MIDPOINT};
use dsp::{DdsEngine, Lut, SliceBuffer};
use rp2040_hal as hal;
use rp2040_hal::multicore::{Core, Stack};
use rp2040_hal::pac;

use crate::exchange::ParameterExchange;

/// Core 1's stack, statically allocated the way every `rp2040-hal`
/// multicore example reserves it (it must outlive the spawned closure).
static mut CORE1_STACK: Stack<4096> = Stack::new();

/// Two PWM slices, each driving one pair of channels (`PWM_A`/`PWM_B` on
/// slice 0, `PWM_C`/`PWM_D` on slice 1 per §6's pin map).
const SLICE_A: u8 = 0;
const SLICE_B: u8 = 1;

/// One ring buffer per slice, long enough for two `DDS_BUFFER_SIZE`
/// halves; DMA replays it forever, Core 1 refills the trailing half.
#[repr(align(2048))]
struct RingBuffer([u32; 2 * DDS_BUFFER_SIZE]);

impl RingBuffer {
    const fn silent() -> Self {
        let word = (PWM_COMPARE_MIDPOINT as u32) | ((PWM_COMPARE_MIDPOINT as u32) << 16);
        Self([word; 2 * DDS_BUFFER_SIZE])
    }
}

static mut RING_A: RingBuffer = RingBuffer::silent();
static mut RING_B: RingBuffer = RingBuffer::silent();

/// Peripherals Core 1 needs exclusive ownership of once spawned; Core 0
/// never touches these again (§5 "Ownership").
pub struct SynthesisCoreResources {
    pub pwm: pac::PWM,
    pub dma: pac::DMA,
}

/// Bring up both PWM slices (50 kHz wrap, §4.1 "PWM carrier") and spawn
/// the DDS refill loop on Core 1. `sys_clock_hz` is the system clock
/// `clocks::init` just configured, needed to compute the clock divisor
/// that gets each slice's wrap rate to `PWM_FREQUENCY_HZ`.
pub fn spawn_synthesis_core(
    resources: SynthesisCoreResources,
    sys_clock_hz: u32,
    psm: &mut pac::PSM,
    ppb: &mut pac::PPB,
    sio_fifo: &mut hal::sio::SioFifo,
    exchange: &'static ParameterExchange,
) {
    let SynthesisCoreResources { pwm, dma } = resources;
    configure_pwm_slices(&pwm, sys_clock_hz);

    let ring_a = unsafe { &mut RING_A };
    let ring_b = unsafe { &mut RING_B };
    configure_ring_dma(&dma, &pwm, 0, ring_a.0.as_ptr() as u32, ring_a.0.len(), SLICE_A);
    configure_ring_dma(&dma, &pwm, 1, ring_b.0.as_ptr() as u32, ring_b.0.len(), SLICE_B);

    let mut mc = hal::multicore::Multicore::new(psm, ppb, sio_fifo);
    let cores = mc.cores();
    let core1 = &mut cores[1];
    let stack_mem = unsafe { &mut CORE1_STACK.mem };
    let _ = core1.spawn(stack_mem, move || synthesis_loop(exchange, &dma, ring_a, ring_b));
}

/// TOP is fixed at `PWM_COMPARE_MAX` (§4.1); only the clock divisor
/// varies, computed so `sys_clock_hz / div / (TOP + 1) == PWM_FREQUENCY_HZ`.
fn configure_pwm_slices(pwm: &pac::PWM, sys_clock_hz: u32) {
    use dsp::design_parameters::{PWM_COMPARE_MAX, PWM_FREQUENCY_HZ};

    let divisor = sys_clock_hz as f32 / (PWM_FREQUENCY_HZ as f32 * (PWM_COMPARE_MAX as f32 + 1.0));
    let div_int = divisor as u8;
    let div_frac = ((divisor - div_int as f32) * 16.0) as u8;

    for slice in [SLICE_A, SLICE_B] {
        let ch = pwm.ch(slice as usize);
        ch.div().write(|w| unsafe { w.int().bits(div_int).frac().bits(div_frac) });
        ch.top().write(|w| unsafe { w.top().bits(PWM_COMPARE_MAX as u16) });
        ch.csr().write(|w| w.en().set_bit());
    }
}

/// Wire one DMA channel as a self-chained, read-ring source into a PWM
/// slice's compare register: `treq_sel` paces transfers off that slice's
/// wrap event (DREQ numbering per the RP2040 datasheet: `PWM_WRAP0 + n`),
/// `chain_to` itself re-triggers the same channel once the ring's
/// transfer count elapses, and the read-address ring bit makes the
/// address wrap back to the buffer start rather than run off the end.
fn configure_ring_dma(dma: &pac::DMA, pwm: &pac::PWM, channel: usize, read_addr: u32, words: usize, slice: u8) {
    let ch = dma.ch(channel);
    let ring_size_bits = words.trailing_zeros() as u8 + 2; // words * 4 bytes, log2.
    let pwm_cc_addr = pwm.ch(slice as usize).cc().as_ptr() as u32;

    ch.ch_read_addr().write(|w| unsafe { w.bits(read_addr) });
    ch.ch_write_addr().write(|w| unsafe { w.bits(pwm_cc_addr) });
    ch.ch_trans_count().write(|w| unsafe { w.bits(words as u32) });
    ch.ch_ctrl_trig().write(|w| unsafe {
        w.data_size().bits(2) // 32-bit transfers.
            .incr_read().set_bit()
            .incr_write().clear_bit()
            .ring_sel().clear_bit() // ring applies to the read (source) address.
            .ring_size().bits(ring_size_bits)
            .chain_to().bits(channel as u8)
            .treq_sel().bits(0x18 + slice) // DREQ_PWM_WRAP0 + slice.
            .en().set_bit()
    });
}

/// Core 1's whole job: refill whichever ring half the DMA channels aren't
/// currently reading from, forever. No interrupts, no RTIC task queue --
/// a polled loop is the entire scheduler, matching the control core's own
/// `App::tick` structure.
///
/// Both slices share one `DdsEngine`, which advances one master phase per
/// buffer and emits both slices' words from the same call (§4.2 "no
/// publish can tear a buffer in two"); since both PWM slices run off the
/// same wrap rate and started together, their ring channels cross the
/// half-buffer boundary on the same tick, so it is enough to watch
/// channel 0 as the shared cadence and refill both trailing halves
/// together.
fn synthesis_loop(
    exchange: &'static ParameterExchange,
    dma: &pac::DMA,
    ring_a: &'static mut RingBuffer,
    ring_b: &'static mut RingBuffer,
) -> ! {
    let lut = Lut::generate();
    let mut engine = DdsEngine::new(&lut);
    let mut last_half = usize::MAX;
    let ring_a_base = ring_a.0.as_ptr() as u32;

    loop {
        let half = current_read_half(dma, 0, ring_a_base, ring_a.0.len());
        if half != last_half {
            let params = exchange.acquire_active();
            let target_a = trailing_half_mut(&mut ring_a.0, half);
            let target_b = trailing_half_mut(&mut ring_b.0, half);
            engine.refill(&params, target_a, target_b);
            last_half = half;
        }
    }
}

/// Which half of the ring (0 or 1) the DMA channel's live read pointer
/// currently sits in -- the CPU must write only into the *other* half.
/// `base` is the ring's own start address, fixed at `configure_ring_dma`
/// time and never touched by hardware (only the live pointer moves).
fn current_read_half(dma: &pac::DMA, channel: usize, base: u32, words: usize) -> usize {
    let ch = dma.ch(channel);
    let current = ch.ch_read_addr().read().bits();
    let offset_words = current.wrapping_sub(base) / 4;
    if (offset_words as usize) < words / 2 {
        0
    } else {
        1
    }
}

fn trailing_half_mut(ring: &mut [u32; 2 * DDS_BUFFER_SIZE], active_half: usize) -> &mut SliceBuffer {
    let (first, second) = ring.split_at_mut(DDS_BUFFER_SIZE);
    let target = if active_half == 0 { second } else { first };
    target.try_into().expect("half is exactly DDS_BUFFER_SIZE words")
}
