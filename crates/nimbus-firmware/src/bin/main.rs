#![no_std]
#![no_main]
#![deny(
    clippy::mem_forget,
    reason = "mem::forget is generally not safe to do with esp_hal types, especially those \
    holding buffers for the duration of a data transfer."
)]
#![deny(clippy::large_stack_frames)]

use core::cell::RefCell;

use embassy_executor::Spawner;
use embassy_net::StackResources;
use embassy_time::Delay;
use esp_hal::Blocking;
use esp_hal::clock::CpuClock;
use esp_hal::gpio::{Input, InputConfig, Level, Output, OutputConfig, Pull};
use esp_hal::rng::Rng;
use esp_hal::time::Rate;
use esp_hal::timer::timg::TimerGroup;
use log::info;
use static_cell::StaticCell;

// Display-LCD panel and SD card share one SPI bus
use embedded_hal_bus::spi::RefCellDevice;
use embedded_sdmmc::SdCard;
use esp_hal::spi::master::{Config as SpiConfig, Spi};
use mipidsi::interface::SpiInterface;
use mipidsi::options::{ColorInversion, ColorOrder};
use mipidsi::{Builder as MipidsiBuilder, models::ILI9342CRgb565};

use nimbus_core::command::{command_receiver, command_sender};
use nimbus_core::display_manager::DisplayManager;
use nimbus_core::input::Button;
use nimbus_core::{DISPLAY_HEIGHT_PX, DISPLAY_WIDTH_PX};
use nimbus_firmware::config::device_config;
use nimbus_firmware::net::{HttpForecastSource, net_task};
use nimbus_firmware::sd_store::{FixedTime, SdAssetStore};
use nimbus_firmware::tasks::{button_task, refresh_task};

#[panic_handler]
fn panic(info: &core::panic::PanicInfo) -> ! {
    rtt_target::rprintln!("PANIC: {}", info);
    loop {}
}

extern crate alloc;

// This creates a default app-descriptor required by the esp-idf bootloader.
// For more information see: <https://docs.espressif.com/projects/esp-idf/en/stable/esp32/api-reference/system/app_image_format.html#application-description>
esp_bootloader_esp_idf::esp_app_desc!();

macro_rules! mk_static {
    ($t:ty,$val:expr) => {{
        static STATIC_CELL: StaticCell<$t> = StaticCell::new();
        #[deny(unused_attributes)]
        let x = STATIC_CELL.uninit().write(($val));
        x
    }};
}

#[allow(
    clippy::large_stack_frames,
    reason = "it's not unusual to allocate larger buffers etc. in main"
)]
#[esp_rtos::main]
async fn main(spawner: Spawner) -> ! {
    rtt_target::rtt_init_log!();

    let config = esp_hal::Config::default().with_cpu_clock(CpuClock::max());
    let peripherals = esp_hal::init(config);

    esp_alloc::heap_allocator!(#[esp_hal::ram(reclaimed)] size: 73744);
    // The framebuffer and the HTTP response buffer live in PSRAM
    esp_alloc::psram_allocator!(peripherals.PSRAM, esp_hal::psram);

    let timg0 = TimerGroup::new(peripherals.TIMG0);
    esp_rtos::start(timg0.timer0);

    info!("Embassy initialized!");

    let device_config = device_config().expect("Invalid device configuration");
    info!(
        "Location {} from {}, update every {} min",
        device_config.location_woeid, device_config.api_host, device_config.update_period_minutes
    );

    // Network stack; the radio itself is started per fetch
    let radio = &*mk_static!(
        esp_radio::Controller<'static>,
        esp_radio::init().expect("Failed to initialize Wi-Fi controller")
    );
    let (wifi_controller, interfaces) =
        esp_radio::wifi::new(radio, peripherals.WIFI, Default::default())
            .expect("Failed to initialize Wi-Fi controller");

    let rng = Rng::new();
    let seed = (u64::from(rng.random()) << 32) | u64::from(rng.random());
    let (stack, runner) = embassy_net::new(
        interfaces.sta,
        embassy_net::Config::dhcpv4(Default::default()),
        mk_static!(StackResources<3>, StackResources::<3>::new()),
        seed,
    );
    spawner.must_spawn(net_task(runner));

    // Front-panel buttons A/B/C, active low with external pull-ups
    let button_pins = [
        Input::new(peripherals.GPIO39, InputConfig::default().with_pull(Pull::None)),
        Input::new(peripherals.GPIO38, InputConfig::default().with_pull(Pull::None)),
        Input::new(peripherals.GPIO37, InputConfig::default().with_pull(Pull::None)),
    ];
    for (button, pin) in Button::ALL.into_iter().zip(button_pins) {
        spawner.must_spawn(button_task(button, pin, command_sender()));
    }
    spawner.must_spawn(refresh_task(device_config.update_period(), command_sender()));

    // 1. Configure the shared SPI bus
    let spi = Spi::new(
        peripherals.SPI2,
        SpiConfig::default().with_frequency(Rate::from_mhz(20)),
    )
    .expect("Failed to configure SPI")
    .with_sck(peripherals.GPIO18)
    .with_mosi(peripherals.GPIO23)
    .with_miso(peripherals.GPIO19);
    let spi_bus = &*mk_static!(RefCell<Spi<'static, Blocking>>, RefCell::new(spi));

    // 2. LCD device, DC and reset pins, backlight on
    let lcd_cs = Output::new(peripherals.GPIO14, Level::High, OutputConfig::default());
    let lcd_device = RefCellDevice::new_no_delay(spi_bus, lcd_cs).expect("LCD chip select");
    let dc = Output::new(peripherals.GPIO27, Level::Low, OutputConfig::default());
    let reset = Output::new(peripherals.GPIO33, Level::High, OutputConfig::default());
    let _backlight = Output::new(peripherals.GPIO32, Level::High, OutputConfig::default());

    // 3. Display interface with an SPI batching buffer
    let spi_buffer = mk_static!([u8; 512], [0u8; 512]);
    let di = SpiInterface::new(lcd_device, dc, spi_buffer);

    // 4. Build and initialize the display driver
    let mut display = MipidsiBuilder::new(ILI9342CRgb565, di)
        .reset_pin(reset)
        .display_size(DISPLAY_WIDTH_PX, DISPLAY_HEIGHT_PX)
        .invert_colors(ColorInversion::Inverted)
        .color_order(ColorOrder::Bgr)
        .init(&mut Delay)
        .expect("Failed to initialize display");

    info!("Display initialized!");

    // 5. SD card on the same bus
    let sd_cs = Output::new(peripherals.GPIO4, Level::High, OutputConfig::default());
    let sd_device = RefCellDevice::new(spi_bus, sd_cs, Delay).expect("SD chip select");
    let store = SdAssetStore::new(SdCard::new(sd_device, Delay), FixedTime);

    let source = HttpForecastSource::new(wifi_controller, stack, &device_config);

    let mut manager = DisplayManager::new(store, source, device_config.initial_view());
    manager.run(command_receiver(), &mut display).await
}
