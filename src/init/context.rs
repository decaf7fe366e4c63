use std::sync::Arc;

use vulkano::{
    command_buffer::allocator::{
        StandardCommandBufferAllocator, StandardCommandBufferAllocatorCreateInfo,
    },
    descriptor_set::allocator::{
        StandardDescriptorSetAllocator, StandardDescriptorSetAllocatorCreateInfo,
    },
    device::{
        physical::{PhysicalDevice, PhysicalDeviceType},
        Device, DeviceCreateInfo, DeviceExtensions, Queue, QueueCreateInfo, QueueFlags,
    },
    instance::{Instance, InstanceCreateFlags, InstanceCreateInfo, InstanceExtensions},
    memory::allocator::StandardMemoryAllocator,
    swapchain::Surface,
    Version, VulkanLibrary,
};
use winit::{event_loop::EventLoopWindowTarget, window::Window};

use crate::error::InitError;

const VALIDATION_LAYER: &str = "VK_LAYER_KHRONOS_validation";

/// Work group limits of the compute stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ComputeLimits {
    pub max_work_group_count: [u32; 3],
    pub max_work_group_size: [u32; 3],
    pub max_work_group_invocations: u32,
}

#[allow(clippy::module_name_repetitions)]
pub struct VulkanoContext {
    surface: Arc<Surface>,
    device: Arc<Device>,
    queue: Arc<Queue>,
    memory_allocator: Arc<StandardMemoryAllocator>,
    command_buffer_allocator: Arc<StandardCommandBufferAllocator>,
    descriptor_set_allocator: Arc<StandardDescriptorSetAllocator>,
}

impl VulkanoContext {
    pub fn new<T>(
        event_loop: &EventLoopWindowTarget<T>,
        window: &Arc<Window>,
    ) -> Result<Self, InitError> {
        let library = VulkanLibrary::new()?;

        tracing::debug!("Vulkan library loaded");

        let mut enabled_extensions = Surface::required_extensions(event_loop);
        let mut flags = InstanceCreateFlags::empty();
        if cfg!(target_os = "macos") {
            enabled_extensions = enabled_extensions.union(&InstanceExtensions {
                khr_portability_enumeration: true,
                ..InstanceExtensions::empty()
            });
            flags |= InstanceCreateFlags::ENUMERATE_PORTABILITY;
        }
        if !library.supported_extensions().contains(&enabled_extensions) {
            return Err(InitError::MissingExtensions);
        }

        let enabled_layers = if cfg!(debug_assertions)
            && library
                .layer_properties()?
                .any(|layer| layer.name() == VALIDATION_LAYER)
        {
            tracing::debug!("Enabling {VALIDATION_LAYER}");
            vec![VALIDATION_LAYER.to_string()]
        } else {
            Vec::new()
        };

        let instance = Instance::new(
            library,
            InstanceCreateInfo {
                flags,
                application_version: Version::major_minor(0, 1),
                enabled_extensions,
                enabled_layers,
                ..Default::default()
            },
        )?;

        let surface = Surface::from_window(instance.clone(), window.clone())?;

        let mut device_extensions = DeviceExtensions {
            khr_swapchain: true,
            ..DeviceExtensions::empty()
        };

        let (physical_device, queue_family_index) = instance
            .enumerate_physical_devices()?
            .filter(|p| p.supported_extensions().contains(&device_extensions))
            .filter_map(|p| {
                let index = Self::queue_family(&p, &surface)?;
                Some((p, index))
            })
            .min_by_key(|(p, _)| match p.properties().device_type {
                PhysicalDeviceType::DiscreteGpu => 1,
                PhysicalDeviceType::IntegratedGpu => 2,
                PhysicalDeviceType::VirtualGpu => 3,
                PhysicalDeviceType::Cpu => 4,
                PhysicalDeviceType::Other => 5,
                _ => 6,
            })
            .ok_or(InitError::NoSuitableDevice)?;

        tracing::info!(
            "Using device {} (type: {:?})",
            physical_device.properties().device_name,
            physical_device.properties().device_type,
        );

        if physical_device.supported_extensions().khr_portability_subset {
            device_extensions.khr_portability_subset = true;
        }

        let (device, mut queues) = Device::new(
            physical_device,
            DeviceCreateInfo {
                queue_create_infos: vec![QueueCreateInfo {
                    queue_family_index,
                    ..Default::default()
                }],
                enabled_extensions: device_extensions,
                ..Default::default()
            },
        )?;
        let queue = queues.next().ok_or(InitError::NoQueue)?;

        let memory_allocator = Arc::new(StandardMemoryAllocator::new_default(device.clone()));

        let command_buffer_allocator = StandardCommandBufferAllocator::new(
            device.clone(),
            StandardCommandBufferAllocatorCreateInfo::default(),
        )
        .into();

        let descriptor_set_allocator = StandardDescriptorSetAllocator::new(
            device.clone(),
            StandardDescriptorSetAllocatorCreateInfo::default(),
        )
        .into();

        let context = Self {
            surface,
            device,
            queue,
            memory_allocator,
            command_buffer_allocator,
            descriptor_set_allocator,
        };
        context.log_compute_limits();
        Ok(context)
    }

    /// A single family serves compute, graphics and present.
    fn queue_family(physical_device: &Arc<PhysicalDevice>, surface: &Surface) -> Option<u32> {
        physical_device
            .queue_family_properties()
            .iter()
            .enumerate()
            .filter_map(|(i, q)| Some((u32::try_from(i).ok()?, q)))
            .find(|(i, q)| {
                q.queue_flags
                    .contains(QueueFlags::GRAPHICS | QueueFlags::COMPUTE)
                    && physical_device.surface_support(*i, surface).unwrap_or(false)
            })
            .map(|(i, _)| i)
    }

    fn log_compute_limits(&self) {
        let limits = self.compute_limits();
        let [x, y, z] = limits.max_work_group_count;
        tracing::info!("Max global (total) work group counts x:{x} y:{y} z:{z}");
        let [x, y, z] = limits.max_work_group_size;
        tracing::info!("Max local (in one shader) work group sizes x:{x} y:{y} z:{z}");
        tracing::info!(
            "Max local work group invocations {}",
            limits.max_work_group_invocations
        );
    }

    #[must_use]
    pub fn compute_limits(&self) -> ComputeLimits {
        let properties = self.device.physical_device().properties();
        ComputeLimits {
            max_work_group_count: properties.max_compute_work_group_count,
            max_work_group_size: properties.max_compute_work_group_size,
            max_work_group_invocations: properties.max_compute_work_group_invocations,
        }
    }

    #[must_use]
    pub const fn surface(&self) -> &Arc<Surface> {
        &self.surface
    }

    #[must_use]
    pub const fn device(&self) -> &Arc<Device> {
        &self.device
    }

    /// Graphics + compute queue that can also present.
    #[must_use]
    pub const fn queue(&self) -> &Arc<Queue> {
        &self.queue
    }

    #[must_use]
    pub const fn memory_allocator(&self) -> &Arc<StandardMemoryAllocator> {
        &self.memory_allocator
    }

    #[must_use]
    pub const fn command_buffer_allocator(&self) -> &Arc<StandardCommandBufferAllocator> {
        &self.command_buffer_allocator
    }

    #[must_use]
    pub const fn descriptor_set_allocator(&self) -> &Arc<StandardDescriptorSetAllocator> {
        &self.descriptor_set_allocator
    }
}
