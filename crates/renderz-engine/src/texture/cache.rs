use std::collections::HashMap;

use crate::error::{RenderError, RenderResult};

use super::{GpuTexture, TextureAllocator, TextureDesc, TextureFormat};

/// Format used by [`TextureCache::alloc_texture_id`] and
/// [`TextureCache::alloc_texture_pair`] callers that have no preference.
pub const DEFAULT_ENTRY_FORMAT: TextureFormat = TextureFormat::Rgba16Float;

/// Ensures `slot` holds a texture matching `desc` and returns it.
///
/// - A texture already matching width, height and format is returned unchanged.
/// - Otherwise a new texture is allocated; on success the previous one (if any)
///   is released and replaced.
/// - On allocation failure `slot` is left untouched and the error is returned,
///   so the slot always matches the last successful request.
pub fn check_texture_size<'s, A>(
    alloc: &mut A,
    slot: &'s mut Option<A::Texture>,
    desc: TextureDesc,
) -> RenderResult<&'s A::Texture>
where
    A: TextureAllocator + ?Sized,
{
    let matches = slot.as_ref().is_some_and(|t| t.desc() == desc);
    if !matches {
        let fresh = alloc.allocate_texture(desc)?;
        if let Some(old) = slot.replace(fresh) {
            log::trace!(
                "reallocated texture {}x{} {:?} -> {}x{} {:?}",
                old.width(),
                old.height(),
                old.format(),
                desc.width,
                desc.height,
                desc.format
            );
            alloc.release_texture(old);
        }
    }

    slot.as_ref()
        .ok_or_else(|| RenderError::AllocationFailed { desc, reason: "empty slot".to_string() })
}

/// Member of a [`PingPongSlot`].
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum PairMember {
    First,
    Second,
}

impl PairMember {
    #[inline]
    pub fn other(self) -> Self {
        match self {
            PairMember::First => PairMember::Second,
            PairMember::Second => PairMember::First,
        }
    }
}

/// Two equally sized textures used alternately as read and write targets.
///
/// The active member is always one of the two; switching never allocates.
#[derive(Debug, Clone)]
pub struct PingPongSlot<T> {
    first: T,
    second: T,
    active: PairMember,
}

impl<T> PingPongSlot<T> {
    #[inline]
    pub fn new(first: T, second: T) -> Self {
        Self { first, second, active: PairMember::First }
    }

    #[inline]
    pub fn member(&self, member: PairMember) -> &T {
        match member {
            PairMember::First => &self.first,
            PairMember::Second => &self.second,
        }
    }

    #[inline]
    pub fn active_member(&self) -> PairMember {
        self.active
    }

    #[inline]
    pub fn active(&self) -> &T {
        self.member(self.active)
    }

    #[inline]
    pub fn inactive(&self) -> &T {
        self.member(self.active.other())
    }

    /// Flips which member is active.
    #[inline]
    pub fn switch(&mut self) {
        self.active = self.active.other();
    }

    fn into_members(self) -> (T, T) {
        (self.first, self.second)
    }
}

/// Keyed store of single textures and ping-pong pairs.
///
/// The cache does not own an allocator; every mutating call borrows one. This
/// keeps the backend free to be used for rendering between cache calls.
#[derive(Debug)]
pub struct TextureCache<T> {
    textures: HashMap<String, T>,
    pairs: HashMap<String, PingPongSlot<T>>,
}

impl<T> Default for TextureCache<T> {
    fn default() -> Self {
        Self { textures: HashMap::new(), pairs: HashMap::new() }
    }
}

impl<T: GpuTexture> TextureCache<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of single entries plus pairs.
    #[inline]
    pub fn len(&self) -> usize {
        self.textures.len() + self.pairs.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    #[inline]
    pub fn contains_id(&self, id: &str) -> bool {
        self.textures.contains_key(id)
    }

    #[inline]
    pub fn contains_pair(&self, id: &str) -> bool {
        self.pairs.contains_key(id)
    }

    /// Ensures the entry `id` exists at the requested size and format.
    pub fn alloc_texture_id<A>(
        &mut self,
        alloc: &mut A,
        id: &str,
        width: u32,
        height: u32,
        format: TextureFormat,
    ) -> RenderResult<&T>
    where
        A: TextureAllocator<Texture = T> + ?Sized,
    {
        let desc = TextureDesc::new(width, height, format);
        let mut slot = self.textures.remove(id);
        let result = check_texture_size(alloc, &mut slot, desc).map(|_| ());
        if let Some(texture) = slot {
            self.textures.insert(id.to_string(), texture);
        }
        result?;
        self.get_texture_of_id(id)
    }

    /// Ensures both members of pair `id` exist at the requested size and format.
    ///
    /// A newly created pair starts with the first member active. Reallocating an
    /// existing pair keeps its current active member.
    pub fn alloc_texture_pair<A>(
        &mut self,
        alloc: &mut A,
        id: &str,
        width: u32,
        height: u32,
        format: TextureFormat,
    ) -> RenderResult<&PingPongSlot<T>>
    where
        A: TextureAllocator<Texture = T> + ?Sized,
    {
        let desc = TextureDesc::new(width, height, format);
        let matches = self
            .pairs
            .get(id)
            .is_some_and(|p| p.first.desc() == desc && p.second.desc() == desc);
        if matches {
            return self.pair(id);
        }
        let existing = self.pairs.remove(id);

        // Both members are allocated before the stored pair is touched, so a
        // failure leaves the previous pair (sizes and active member) intact.
        let fresh = alloc.allocate_texture(desc).and_then(|first| match alloc.allocate_texture(desc) {
            Ok(second) => Ok((first, second)),
            Err(err) => {
                alloc.release_texture(first);
                Err(err)
            }
        });

        match fresh {
            Ok((first, second)) => {
                let active = match existing {
                    Some(old) => {
                        log::trace!(
                            "reallocated pair `{id}` {}x{} -> {}x{} {:?}",
                            old.first.width(),
                            old.first.height(),
                            desc.width,
                            desc.height,
                            desc.format
                        );
                        let active = old.active;
                        let (a, b) = old.into_members();
                        alloc.release_texture(a);
                        alloc.release_texture(b);
                        active
                    }
                    None => PairMember::First,
                };
                self.pairs.insert(id.to_string(), PingPongSlot { first, second, active });
                self.pair(id)
            }
            Err(err) => {
                if let Some(old) = existing {
                    self.pairs.insert(id.to_string(), old);
                }
                Err(err)
            }
        }
    }

    pub fn get_texture_of_id(&self, id: &str) -> RenderResult<&T> {
        self.textures.get(id).ok_or_else(|| RenderError::UnknownKey(id.to_string()))
    }

    pub fn pair(&self, id: &str) -> RenderResult<&PingPongSlot<T>> {
        self.pairs.get(id).ok_or_else(|| RenderError::UnknownKey(id.to_string()))
    }

    pub fn get_active_of_pair(&self, id: &str) -> RenderResult<&T> {
        self.pair(id).map(PingPongSlot::active)
    }

    pub fn get_inactive_of_pair(&self, id: &str) -> RenderResult<&T> {
        self.pair(id).map(PingPongSlot::inactive)
    }

    /// Flips the active member of pair `id`.
    pub fn switch_pair(&mut self, id: &str) -> RenderResult<()> {
        let pair = self
            .pairs
            .get_mut(id)
            .ok_or_else(|| RenderError::UnknownKey(id.to_string()))?;
        pair.switch();
        Ok(())
    }

    /// Removes and releases entry `id`. Returns `false` if it did not exist.
    pub fn free_texture_id<A>(&mut self, alloc: &mut A, id: &str) -> bool
    where
        A: TextureAllocator<Texture = T> + ?Sized,
    {
        match self.textures.remove(id) {
            Some(texture) => {
                alloc.release_texture(texture);
                true
            }
            None => false,
        }
    }

    /// Removes and releases both members of pair `id`. Returns `false` if it did not exist.
    pub fn free_texture_pair<A>(&mut self, alloc: &mut A, id: &str) -> bool
    where
        A: TextureAllocator<Texture = T> + ?Sized,
    {
        match self.pairs.remove(id) {
            Some(pair) => {
                let (first, second) = pair.into_members();
                alloc.release_texture(first);
                alloc.release_texture(second);
                true
            }
            None => false,
        }
    }

    /// Releases every entry and pair.
    pub fn clear<A>(&mut self, alloc: &mut A)
    where
        A: TextureAllocator<Texture = T> + ?Sized,
    {
        for (_, texture) in self.textures.drain() {
            alloc.release_texture(texture);
        }
        for (_, pair) in self.pairs.drain() {
            let (first, second) = pair.into_members();
            alloc.release_texture(first);
            alloc.release_texture(second);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone)]
    struct FakeTexture {
        id: u32,
        desc: TextureDesc,
    }

    impl GpuTexture for FakeTexture {
        fn desc(&self) -> TextureDesc {
            self.desc
        }

        fn same_texture(&self, other: &Self) -> bool {
            self.id == other.id
        }
    }

    #[derive(Default)]
    struct FakeAllocator {
        next_id: u32,
        allocations: u32,
        released: Vec<u32>,
        /// Fail every allocation once this many have succeeded.
        fail_after: Option<u32>,
    }

    impl TextureAllocator for FakeAllocator {
        type Texture = FakeTexture;

        fn allocate_texture(&mut self, desc: TextureDesc) -> RenderResult<FakeTexture> {
            if self.fail_after.is_some_and(|n| self.allocations >= n) {
                return Err(RenderError::AllocationFailed { desc, reason: "budget".into() });
            }
            self.allocations += 1;
            self.next_id += 1;
            Ok(FakeTexture { id: self.next_id, desc })
        }

        fn release_texture(&mut self, texture: FakeTexture) {
            self.released.push(texture.id);
        }
    }

    const F16: TextureFormat = TextureFormat::Rgba16Float;

    // ── check_texture_size ────────────────────────────────────────────────

    #[test]
    fn identical_request_keeps_handle() {
        let mut alloc = FakeAllocator::default();
        let mut slot = None;
        let desc = TextureDesc::new(64, 32, TextureFormat::Bgra8Unorm);

        let first = check_texture_size(&mut alloc, &mut slot, desc).unwrap().clone();
        let second = check_texture_size(&mut alloc, &mut slot, desc).unwrap().clone();

        assert!(first.same_texture(&second));
        assert_eq!(alloc.allocations, 1);
        assert!(alloc.released.is_empty());
    }

    #[test]
    fn size_change_releases_old_texture() {
        let mut alloc = FakeAllocator::default();
        let mut slot = None;
        let old = check_texture_size(&mut alloc, &mut slot, TextureDesc::new(8, 8, F16))
            .unwrap()
            .clone();
        let new = check_texture_size(&mut alloc, &mut slot, TextureDesc::new(16, 8, F16))
            .unwrap()
            .clone();

        assert!(!old.same_texture(&new));
        assert_eq!(new.desc, TextureDesc::new(16, 8, F16));
        assert_eq!(alloc.released, vec![old.id]);
    }

    #[test]
    fn format_change_reallocates() {
        let mut alloc = FakeAllocator::default();
        let mut slot = None;
        check_texture_size(&mut alloc, &mut slot, TextureDesc::new(8, 8, F16)).unwrap();
        check_texture_size(&mut alloc, &mut slot, TextureDesc::new(8, 8, TextureFormat::Rgba32Float))
            .unwrap();
        assert_eq!(alloc.allocations, 2);
        assert_eq!(alloc.released.len(), 1);
    }

    #[test]
    fn failed_allocation_keeps_previous_texture() {
        let mut alloc = FakeAllocator { fail_after: Some(1), ..Default::default() };
        let mut slot = None;
        check_texture_size(&mut alloc, &mut slot, TextureDesc::new(8, 8, F16)).unwrap();

        let err = check_texture_size(&mut alloc, &mut slot, TextureDesc::new(9, 9, F16)).unwrap_err();
        assert!(matches!(err, RenderError::AllocationFailed { .. }));
        assert_eq!(slot.as_ref().map(|t| t.desc), Some(TextureDesc::new(8, 8, F16)));
        assert!(alloc.released.is_empty());
    }

    // ── single entries ────────────────────────────────────────────────────

    #[test]
    fn alloc_texture_id_is_lazy_and_stable() {
        let mut alloc = FakeAllocator::default();
        let mut cache = TextureCache::new();
        let a = cache.alloc_texture_id(&mut alloc, "blur", 10, 10, F16).unwrap().clone();
        let b = cache.alloc_texture_id(&mut alloc, "blur", 10, 10, F16).unwrap().clone();
        assert!(a.same_texture(&b));
        assert!(cache.get_texture_of_id("blur").unwrap().same_texture(&a));
    }

    #[test]
    fn freed_entry_is_unknown() {
        let mut alloc = FakeAllocator::default();
        let mut cache = TextureCache::new();
        cache.alloc_texture_id(&mut alloc, "tmp", 4, 4, F16).unwrap();

        assert!(cache.free_texture_id(&mut alloc, "tmp"));
        assert!(!cache.free_texture_id(&mut alloc, "tmp"));
        assert_eq!(
            cache.get_texture_of_id("tmp").unwrap_err(),
            RenderError::UnknownKey("tmp".to_string())
        );
        assert_eq!(alloc.released.len(), 1);
    }

    #[test]
    fn failed_reallocation_keeps_entry() {
        let mut alloc = FakeAllocator { fail_after: Some(1), ..Default::default() };
        let mut cache = TextureCache::new();
        cache.alloc_texture_id(&mut alloc, "acc", 4, 4, F16).unwrap();
        assert!(cache.alloc_texture_id(&mut alloc, "acc", 8, 8, F16).is_err());
        assert_eq!(cache.get_texture_of_id("acc").unwrap().desc, TextureDesc::new(4, 4, F16));
    }

    // ── pairs ─────────────────────────────────────────────────────────────

    #[test]
    fn new_pair_starts_on_first_member() {
        let mut alloc = FakeAllocator::default();
        let mut cache = TextureCache::new();
        let pair = cache.alloc_texture_pair(&mut alloc, "accum", 32, 32, F16).unwrap().clone();

        let active = cache.get_active_of_pair("accum").unwrap();
        assert!(active.same_texture(pair.member(PairMember::First)));
        let inactive = cache.get_inactive_of_pair("accum").unwrap();
        assert!(inactive.same_texture(pair.member(PairMember::Second)));
    }

    #[test]
    fn switch_pair_is_an_involution() {
        let mut alloc = FakeAllocator::default();
        let mut cache = TextureCache::new();
        cache.alloc_texture_pair(&mut alloc, "accum", 32, 32, F16).unwrap();
        let before = cache.get_active_of_pair("accum").unwrap().clone();

        cache.switch_pair("accum").unwrap();
        assert!(!cache.get_active_of_pair("accum").unwrap().same_texture(&before));
        assert!(cache.get_inactive_of_pair("accum").unwrap().same_texture(&before));

        cache.switch_pair("accum").unwrap();
        assert!(cache.get_active_of_pair("accum").unwrap().same_texture(&before));
    }

    #[test]
    fn reallocating_pair_keeps_active_member() {
        let mut alloc = FakeAllocator::default();
        let mut cache = TextureCache::new();
        cache.alloc_texture_pair(&mut alloc, "accum", 32, 32, F16).unwrap();
        cache.switch_pair("accum").unwrap();

        let pair = cache.alloc_texture_pair(&mut alloc, "accum", 64, 64, F16).unwrap();
        assert_eq!(pair.active_member(), PairMember::Second);
        assert_eq!(pair.active().desc, TextureDesc::new(64, 64, F16));
        assert_eq!(alloc.released.len(), 2);
    }

    #[test]
    fn unknown_pair_operations_fail() {
        let mut cache: TextureCache<FakeTexture> = TextureCache::new();
        assert!(matches!(cache.get_active_of_pair("nope"), Err(RenderError::UnknownKey(_))));
        assert!(matches!(cache.get_inactive_of_pair("nope"), Err(RenderError::UnknownKey(_))));
        assert!(matches!(cache.switch_pair("nope"), Err(RenderError::UnknownKey(_))));
    }

    #[test]
    fn freed_pair_is_unknown() {
        let mut alloc = FakeAllocator::default();
        let mut cache = TextureCache::new();
        cache.alloc_texture_pair(&mut alloc, "accum", 8, 8, F16).unwrap();
        assert!(cache.free_texture_pair(&mut alloc, "accum"));
        assert!(matches!(cache.get_active_of_pair("accum"), Err(RenderError::UnknownKey(_))));
        assert_eq!(alloc.released.len(), 2);
    }

    #[test]
    fn half_allocated_new_pair_is_rolled_back() {
        let mut alloc = FakeAllocator { fail_after: Some(1), ..Default::default() };
        let mut cache = TextureCache::new();
        assert!(cache.alloc_texture_pair(&mut alloc, "accum", 8, 8, F16).is_err());
        assert!(!cache.contains_pair("accum"));
        assert_eq!(alloc.released.len(), 1);
    }

    #[test]
    fn failed_pair_reallocation_keeps_old_pair() {
        // Two allocations for the pair, then only one more succeeds.
        let mut alloc = FakeAllocator { fail_after: Some(3), ..Default::default() };
        let mut cache = TextureCache::new();
        let old = cache.alloc_texture_pair(&mut alloc, "acc", 8, 8, F16).unwrap().clone();
        cache.switch_pair("acc").unwrap();

        let err = cache.alloc_texture_pair(&mut alloc, "acc", 16, 16, F16).unwrap_err();
        assert!(matches!(err, RenderError::AllocationFailed { .. }));

        let pair = cache.pair("acc").unwrap();
        assert_eq!(pair.member(PairMember::First).desc, TextureDesc::new(8, 8, F16));
        assert_eq!(pair.member(PairMember::Second).desc, TextureDesc::new(8, 8, F16));
        assert!(pair.member(PairMember::First).same_texture(old.member(PairMember::First)));
        assert!(pair.member(PairMember::Second).same_texture(old.member(PairMember::Second)));
        assert_eq!(pair.active_member(), PairMember::Second);

        // The one texture allocated for the failed request is released again.
        assert_eq!(alloc.released, vec![3]);
    }

    #[test]
    fn matching_pair_request_allocates_nothing() {
        let mut alloc = FakeAllocator::default();
        let mut cache = TextureCache::new();
        cache.alloc_texture_pair(&mut alloc, "acc", 8, 8, F16).unwrap();
        cache.alloc_texture_pair(&mut alloc, "acc", 8, 8, F16).unwrap();
        assert_eq!(alloc.allocations, 2);
        assert!(alloc.released.is_empty());
    }

    #[test]
    fn clear_releases_everything() {
        let mut alloc = FakeAllocator::default();
        let mut cache = TextureCache::new();
        cache.alloc_texture_id(&mut alloc, "a", 4, 4, F16).unwrap();
        cache.alloc_texture_pair(&mut alloc, "b", 4, 4, F16).unwrap();
        assert_eq!(cache.len(), 2);

        cache.clear(&mut alloc);
        assert!(cache.is_empty());
        assert_eq!(alloc.released.len(), 3);
    }
}
