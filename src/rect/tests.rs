use crate::rect::Rect;

#[test]
fn sized() {
    let r = Rect::new_sized(10, 20, 30, 40).unwrap();
    assert_eq!(r, Rect::new(10, 20, 40, 60).unwrap());
    assert_eq!(r.width(), 30);
    assert_eq!(r.height(), 40);
    assert!(Rect::new_sized(0, 0, -1, 5).is_none());
    assert!(Rect::new_sized(i32::MAX, 0, 1, 1).is_none());
}

#[test]
fn intersect() {
    let bounds = Rect::of_size(100, 50);
    let r = Rect::new_sized(80, 40, 40, 40).unwrap();
    assert_eq!(bounds.intersect(r), Rect::new(80, 40, 100, 50).unwrap());
    let outside = Rect::new_sized(200, 200, 10, 10).unwrap();
    assert!(bounds.intersect(outside).is_empty());
}

#[test]
fn contains() {
    let bounds = Rect::of_size(100, 50);
    assert!(bounds.contains_rect(&Rect::new_sized(0, 0, 100, 50).unwrap()));
    assert!(!bounds.contains_rect(&Rect::new_sized(0, 1, 100, 50).unwrap()));
    assert!(!bounds.contains_rect(&Rect::new_sized(40, 0, 10, 60).unwrap()));
}
