use {
    crate::{
        backend::{Window, WindowId, WindowIds},
        format::PixelFormat,
        input::InputMessage,
        vsync::VsyncInfo,
    },
    simplelog::{Config, LevelFilter, TestLogger},
    std::{
        cell::{Cell, RefCell},
        rc::Rc,
    },
};

pub fn init_logger() {
    let _ = TestLogger::init(LevelFilter::Trace, Config::default());
}

type VsyncCallback = Box<dyn Fn(&VsyncInfo)>;

pub struct TestWindow {
    pub id: WindowId,
    pub visible: Cell<bool>,
    pub consume_input: Cell<bool>,
    pub vsyncs: RefCell<Vec<VsyncInfo>>,
    pub inputs: RefCell<Vec<InputMessage>>,
    pub resizes: RefCell<Vec<(i32, i32, PixelFormat)>>,
    pub visibility: RefCell<Vec<bool>>,
    pub on_vsync: RefCell<Option<VsyncCallback>>,
}

impl TestWindow {
    pub fn new(ids: &WindowIds) -> Rc<Self> {
        Rc::new(Self {
            id: ids.next(),
            visible: Cell::new(false),
            consume_input: Cell::new(true),
            vsyncs: Default::default(),
            inputs: Default::default(),
            resizes: Default::default(),
            visibility: Default::default(),
            on_vsync: Default::default(),
        })
    }

    pub fn with_visible(ids: &WindowIds, visible: bool) -> Rc<Self> {
        let w = Self::new(ids);
        w.visible.set(visible);
        w
    }

    pub fn vsync_count(&self) -> usize {
        self.vsyncs.borrow().len()
    }
}

impl Window for TestWindow {
    fn id(&self) -> WindowId {
        self.id
    }

    fn on_vsync(&self, vsync: &VsyncInfo) {
        self.vsyncs.borrow_mut().push(*vsync);
        if let Some(cb) = &*self.on_vsync.borrow() {
            cb(vsync);
        }
    }

    fn handle_input(&self, msg: &InputMessage) -> bool {
        self.inputs.borrow_mut().push(*msg);
        self.consume_input.get()
    }

    fn resized(&self, width: i32, height: i32, format: PixelFormat) {
        self.resizes.borrow_mut().push((width, height, format));
    }

    fn visibility_changed(&self, visible: bool) {
        self.visibility.borrow_mut().push(visible);
    }

    fn client_visible(&self) -> bool {
        self.visible.get()
    }
}
